use async_trait::async_trait;
use tracing::debug;

use crate::config::WebSearchConfig;
use crate::error::SearchError;
use crate::util::http;

use super::{OrganicResult, SearchProvider};

/// Search the web using the SerpAPI JSON endpoint.
pub struct SerpApiSearch {
    api_key: String,
    api_base: String,
}

impl SerpApiSearch {
    pub fn new(api_key: String, api_base: String) -> Self {
        Self { api_key, api_base }
    }

    pub fn from_config(config: &WebSearchConfig) -> Self {
        Self::new(config.api_key.clone(), config.api_base.clone())
    }

    /// Extract `organic_results` from a SerpAPI response body.
    fn parse_results(data: &serde_json::Value) -> Result<Vec<OrganicResult>, SearchError> {
        if let Some(message) = data.get("error").and_then(|v| v.as_str()) {
            return Err(SearchError::Api {
                status: 200,
                message: message.to_string(),
            });
        }

        let results = match data.get("organic_results") {
            Some(v) => v,
            None => return Err(SearchError::NoResults),
        };

        let results: Vec<OrganicResult> = serde_json::from_value(results.clone())
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        if results.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(results)
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    async fn search(&self, query: &str) -> Result<Vec<OrganicResult>, SearchError> {
        debug!("SerpAPI search: {}", query);

        let response = http::client()
            .get(&self.api_base)
            .query(&[("q", query), ("api_key", self.api_key.as_str())])
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.without_url().to_string()))?;
        Self::parse_results(&data)
    }
}
