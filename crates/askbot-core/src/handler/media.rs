use tracing::info;

use crate::error::Result;
use crate::store::MediaRecord;
use crate::types::FileRef;

use super::HandlerContext;

pub const DESCRIBE_INSTRUCTION: &str = "Describe this image:";

/// Photo: fetch the image, caption it, record the description, reply with it.
pub async fn describe(ctx: &HandlerContext, chat_id: i64, photo: &FileRef) -> Result<()> {
    let file = ctx.messenger.download_file(&photo.file_id).await?;
    info!(
        "Downloaded {} ({} bytes) for chat {}",
        file.file_name,
        file.bytes.len(),
        chat_id
    );

    let description = ctx
        .llm
        .describe_image(DESCRIBE_INSTRUCTION, &file.bytes, file.mime_type())
        .await?;

    ctx.store
        .insert_media(&MediaRecord::new(chat_id, file.file_name.as_str(), description.as_str()))
        .await?;

    ctx.reply(chat_id, description).await?;
    Ok(())
}
