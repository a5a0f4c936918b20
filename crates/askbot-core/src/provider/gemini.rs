use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::ProviderError;
use crate::util::http;

use super::LlmProvider;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    api_base: String,
    text_model: String,
    vision_model: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        text_model: String,
        vision_model: String,
    ) -> Self {
        let base = api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self {
            api_key,
            api_base: base.trim_end_matches('/').to_string(),
            text_model,
            vision_model,
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.api_base.clone(),
            config.text_model.clone(),
            config.vision_model.clone(),
        )
    }

    /// Normalize model name: strip "gemini/" and "models/" prefixes.
    fn normalize_model(model: &str) -> &str {
        let model = model.strip_prefix("gemini/").unwrap_or(model);
        model.strip_prefix("models/").unwrap_or(model)
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base,
            Self::normalize_model(model)
        )
    }

    /// Request body for a text-only prompt.
    fn text_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        })
    }

    /// Request body for an instruction plus inline image data.
    fn image_body(instruction: &str, image: &[u8], mime_type: &str) -> serde_json::Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": instruction},
                    {"inline_data": {"mime_type": mime_type, "data": encoded}}
                ]
            }]
        })
    }

    async fn generate(&self, model: &str, body: &serde_json::Value) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        debug!("Gemini request with model {}", Self::normalize_model(model));

        let response = http::client()
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let data: serde_json::Value = response.json().await?;
        Self::parse_response(&data)
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(data: &serde_json::Value) -> Result<String, ProviderError> {
        if let Some(reason) = data
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(|v| v.as_str())
        {
            return Err(ProviderError::Parse(format!("Prompt blocked: {}", reason)));
        }

        let candidate = data
            .get("candidates")
            .and_then(|v| v.get(0))
            .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;

        let parts = candidate
            .get("content")
            .and_then(|v| v.get("parts"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::Parse("No parts in response".to_string()))?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
            .collect();

        if text.is_empty() {
            return Err(ProviderError::Parse("No text in response".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate(&self.text_model, &Self::text_body(prompt)).await
    }

    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        let body = Self::image_body(instruction, image, mime_type);
        self.generate(&self.vision_model, &body).await
    }

    fn default_model(&self) -> &str {
        &self.text_model
    }
}
