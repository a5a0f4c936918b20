use tracing::info;

use crate::error::Result;
use crate::store::ProfileSnapshot;
use crate::types::{OutboundMessage, ReplyMarkup, Sender};

use super::HandlerContext;

pub const WELCOME: &str = "Welcome! Please share your phone number.";
pub const SHARE_CONTACT_LABEL: &str = "📱 Share Contact";
pub const CONTACT_SAVED: &str = "✅ Contact saved successfully!";

/// `/start`: register the sender and ask for their phone number.
pub async fn start(ctx: &HandlerContext, chat_id: i64, sender: &Sender) -> Result<()> {
    let snapshot = ProfileSnapshot::from_sender(chat_id, sender);
    ctx.store.upsert_profile(&snapshot).await?;
    info!("Registered user {} for chat {}", sender.id, chat_id);

    let msg = OutboundMessage::new(chat_id, WELCOME).with_markup(ReplyMarkup::RequestContact {
        label: SHARE_CONTACT_LABEL.to_string(),
    });
    ctx.send(&msg).await?;
    Ok(())
}

/// Contact share: store the phone number for the conversation.
pub async fn save_contact(ctx: &HandlerContext, chat_id: i64, phone_number: &str) -> Result<()> {
    ctx.store.set_phone_number(chat_id, phone_number).await?;
    info!("Saved contact for chat {}", chat_id);

    ctx.reply(chat_id, CONTACT_SAVED).await?;
    Ok(())
}
