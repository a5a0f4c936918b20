use tracing::debug;

use crate::error::Result;
use crate::store::ChatRecord;
use crate::util::truncate_string;

use super::HandlerContext;

/// Plain text: generate a reply, log the exchange, send the reply verbatim.
///
/// Input goes to the model unvalidated and uncapped; empty text included.
pub async fn respond(ctx: &HandlerContext, chat_id: i64, text: &str) -> Result<()> {
    debug!("Chat {} asked: {}", chat_id, truncate_string(text, 50, "..."));

    let reply = ctx.llm.generate_text(text).await?;

    ctx.store
        .insert_chat(&ChatRecord::new(chat_id, text, reply.as_str()))
        .await?;

    ctx.reply(chat_id, reply).await?;
    Ok(())
}
