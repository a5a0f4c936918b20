pub mod serpapi;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;
use crate::provider::LlmProvider;

/// Snippet used when the top result carries none.
pub const NO_SUMMARY: &str = "No summary available";

/// One organic search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Trait for web-search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query and return the organic results in ranking order.
    async fn search(&self, query: &str) -> Result<Vec<OrganicResult>, SearchError>;
}

/// AI summary of the top result plus the top links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDigest {
    pub summary: String,
    pub links: Vec<String>,
}

impl SearchDigest {
    /// Render the digest as the chat reply.
    pub fn to_reply(&self) -> String {
        format!(
            "🔎 **Summary:** {}\n\n🌐 **Top Links:**\n{}",
            self.summary,
            self.links.join("\n")
        )
    }
}

/// Search gateway: query the backend, summarize the top snippet, collect links.
#[derive(Clone)]
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmProvider>,
    max_links: usize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>, llm: Arc<dyn LlmProvider>, max_links: usize) -> Self {
        Self {
            provider,
            llm,
            max_links,
        }
    }

    pub async fn run(&self, query: &str) -> Result<SearchDigest, SearchError> {
        let results = self.provider.search(query).await?;
        let top = results.first().ok_or(SearchError::NoResults)?;

        let snippet = top.snippet.as_deref().unwrap_or(NO_SUMMARY);
        debug!("Summarizing top snippet for query '{}'", query);
        let summary = self
            .llm
            .generate_text(&format!("Summarize this: {}", snippet))
            .await?;

        let links = results
            .iter()
            .take(self.max_links)
            .enumerate()
            .map(|(i, r)| {
                r.link
                    .clone()
                    .ok_or_else(|| SearchError::Malformed(format!("result {} has no link", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchDigest { summary, links })
    }
}
