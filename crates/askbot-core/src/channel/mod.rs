pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::types::{DownloadedFile, OutboundMessage};

/// Trait for chat channel implementations.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "telegram").
    fn name(&self) -> &str;

    /// Start the channel and forward inbound events until the receiver goes away.
    async fn start(&mut self) -> anyhow::Result<()>;
}

/// Outbound side of a transport: the reply capability handed to handlers.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message to the conversation named in `msg`.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Fetch the bytes of a file held by the transport.
    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, ChannelError>;
}

/// Check if a sender is allowed based on the allow list.
pub fn is_allowed(sender_id: &str, allow_from: &[String]) -> bool {
    if allow_from.is_empty() {
        return true;
    }
    if allow_from.iter().any(|a| a == sender_id) {
        return true;
    }
    // Check pipe-separated IDs (e.g., "123456|username")
    if sender_id.contains('|') {
        for part in sender_id.split('|') {
            if !part.is_empty() && allow_from.iter().any(|a| a == part) {
                return true;
            }
        }
    }
    false
}
