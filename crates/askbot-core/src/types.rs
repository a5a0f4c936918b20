/// Sender metadata attached to an inbound event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl Sender {
    /// Identifier used for allow-list checks (`id` or `id|username`).
    pub fn allow_key(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("{}|{}", self.id, username),
            _ => self.id.to_string(),
        }
    }
}

/// Reference to a file held by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
}

/// Payload of an inbound event, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// `/name arg1 arg2` style command. `name` has no leading slash or `@bot` suffix.
    Command { name: String, args: Vec<String> },
    /// Contact card shared by the user.
    Contact { phone_number: String },
    /// Photo message; variants ordered from smallest to largest.
    Photo { sizes: Vec<FileRef> },
    /// Plain text message.
    Text(String),
    /// Anything the bot has no handler for.
    Unsupported,
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Command { .. } => "command",
            EventPayload::Contact { .. } => "contact",
            EventPayload::Photo { .. } => "photo",
            EventPayload::Text(_) => "text",
            EventPayload::Unsupported => "unsupported",
        }
    }
}

/// Event received from the messaging transport.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub update_id: i64,
    pub chat_id: i64,
    pub sender: Sender,
    pub payload: EventPayload,
}

impl InboundEvent {
    pub fn new(chat_id: i64, sender: Sender, payload: EventPayload) -> Self {
        Self {
            update_id: 0,
            chat_id,
            sender,
            payload,
        }
    }
}

/// Reply keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// Single button asking the user to share their phone number.
    RequestContact { label: String },
}

/// Message to send back to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub reply_markup: Option<ReplyMarkup>,
}

impl OutboundMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_markup: None,
        }
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// File bytes fetched from the transport.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    /// Best-effort MIME type from the file extension. Telegram re-encodes photos as JPEG.
    pub fn mime_type(&self) -> &'static str {
        let lower = self.file_name.to_lowercase();
        if lower.ends_with(".png") {
            "image/png"
        } else if lower.ends_with(".webp") {
            "image/webp"
        } else if lower.ends_with(".gif") {
            "image/gif"
        } else {
            "image/jpeg"
        }
    }
}
