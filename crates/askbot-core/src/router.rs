use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::handler::{self, HandlerContext};
use crate::types::{EventPayload, FileRef, InboundEvent};

/// Reply sent when a handler fails.
pub const GENERIC_FAILURE: &str = "⚠️ An error occurred. Please try again later.";

/// Handler selected for an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    WebSearch(String),
    Contact(String),
    Photo(FileRef),
    Text(String),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Start => "start",
            Route::WebSearch(_) => "websearch",
            Route::Contact(_) => "contact",
            Route::Photo(_) => "photo",
            Route::Text(_) => "text",
        }
    }
}

/// Map a payload to its route. `None` means the event is dropped.
///
/// Priority: command, contact, photo, text. Unknown commands never fall
/// through to the text handler.
pub fn classify(payload: &EventPayload) -> Option<Route> {
    match payload {
        EventPayload::Command { name, args } => match name.as_str() {
            "start" => Some(Route::Start),
            "websearch" => Some(Route::WebSearch(args.join(" "))),
            _ => None,
        },
        EventPayload::Contact { phone_number } => Some(Route::Contact(phone_number.clone())),
        // Variants arrive smallest first; the last one is the full resolution.
        EventPayload::Photo { sizes } => sizes.last().cloned().map(Route::Photo),
        EventPayload::Text(text) => Some(Route::Text(text.clone())),
        EventPayload::Unsupported => None,
    }
}

/// Routes inbound events to handlers and turns failures into replies.
pub struct Router {
    ctx: HandlerContext,
}

impl Router {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    /// Run the matching handler. Returns `Ok(false)` when no handler matched.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<bool> {
        let route = match classify(&event.payload) {
            Some(route) => route,
            None => {
                debug!(
                    "Dropping {} event from chat {}",
                    event.payload.kind(),
                    event.chat_id
                );
                return Ok(false);
            }
        };

        info!("Routing {} event from chat {}", route.name(), event.chat_id);

        let ctx = &self.ctx;
        let chat_id = event.chat_id;
        match &route {
            Route::Start => handler::user::start(ctx, chat_id, &event.sender).await?,
            Route::Contact(phone) => handler::user::save_contact(ctx, chat_id, phone).await?,
            Route::Text(text) => handler::chat::respond(ctx, chat_id, text).await?,
            Route::Photo(photo) => handler::media::describe(ctx, chat_id, photo).await?,
            Route::WebSearch(query) => handler::search::web_search(ctx, chat_id, query).await?,
        }
        Ok(true)
    }

    /// Handle one event: dispatch, log any failure, send the generic reply.
    pub async fn handle_event(&self, event: &InboundEvent) {
        if let Err(e) = self.dispatch(event).await {
            error!(
                "Update {} ({} from chat {}, sender {}) caused error: {}",
                event.update_id,
                event.payload.kind(),
                event.chat_id,
                event.sender.id,
                e
            );
            if let Err(send_err) = self.ctx.reply(event.chat_id, GENERIC_FAILURE).await {
                error!(
                    "Failed to send error reply to chat {}: {}",
                    event.chat_id, send_err
                );
            }
        }
    }

    /// Consume events one at a time until every sender is dropped.
    pub async fn run(&self, mut inbound_rx: mpsc::Receiver<InboundEvent>) {
        info!("Router started");

        while let Some(event) = inbound_rx.recv().await {
            self.handle_event(&event).await;
        }

        info!("Router stopped");
    }
}
