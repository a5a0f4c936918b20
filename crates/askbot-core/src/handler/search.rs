use tracing::{error, info};

use crate::error::Result;

use super::HandlerContext;

pub const SEARCH_FAILED: &str = "🚨 An error occurred while searching. Please try again.";

/// `/websearch <query>`: summarize the top hit and list the top links.
///
/// Search and summarization failures are answered here with a fixed message;
/// only a failure to deliver that reply reaches the router.
pub async fn web_search(ctx: &HandlerContext, chat_id: i64, query: &str) -> Result<()> {
    info!("Web search for chat {}: '{}'", chat_id, query);

    let reply = match ctx.search.run(query).await {
        Ok(digest) => digest.to_reply(),
        Err(e) => {
            error!("Web search error for chat {}: {}", chat_id, e);
            SEARCH_FAILED.to_string()
        }
    };

    ctx.reply(chat_id, reply).await?;
    Ok(())
}
