/// Core error types for askbot.
#[derive(Debug, thiserror::Error)]
pub enum AskbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No API key configured for provider")]
    NoApiKey,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed search response: {0}")]
    Malformed(String),

    #[error("No organic results")]
    NoResults,

    #[error("Summarization failed: {0}")]
    Summary(#[from] ProviderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Bot token not configured")]
    NoToken,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to write {collection}: {message}")]
    Write {
        collection: &'static str,
        message: String,
    },
}

// Request URLs carry credentials; transport errors drop the URL.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

pub type Result<T> = std::result::Result<T, AskbotError>;
