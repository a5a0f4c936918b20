//! Handlers bound to each routed event kind.
//!
//! Every handler receives the shared [`HandlerContext`] and replies through
//! its messenger. Errors are returned to the router, which logs them and
//! sends the generic failure reply.

pub mod chat;
pub mod media;
pub mod search;
pub mod user;

use std::sync::Arc;

use crate::channel::Messenger;
use crate::error::ChannelError;
use crate::provider::LlmProvider;
use crate::search::WebSearch;
use crate::store::Store;
use crate::types::OutboundMessage;

/// Dependencies shared by all handlers.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LlmProvider>,
    pub search: WebSearch,
    pub messenger: Arc<dyn Messenger>,
}

impl HandlerContext {
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<dyn LlmProvider>,
        search: WebSearch,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            store,
            llm,
            search,
            messenger,
        }
    }

    /// Send plain text back to a conversation.
    pub async fn reply(&self, chat_id: i64, text: impl Into<String>) -> Result<(), ChannelError> {
        self.messenger.send(&OutboundMessage::new(chat_id, text)).await
    }

    pub async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        self.messenger.send(msg).await
    }
}
