pub mod gemini;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Trait for generative-AI providers.
///
/// Implementations are stateless request/response wrappers: no retries and
/// no timeouts beyond the shared HTTP client defaults.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a text completion for a single prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Describe an image given an instruction and the raw image bytes.
    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError>;

    /// Get the default (text) model for this provider.
    fn default_model(&self) -> &str;
}
