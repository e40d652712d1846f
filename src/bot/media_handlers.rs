//! Media Handlers module for processing photo and document messages

use anyhow::Result;
use tracing::debug;

use super::image_processing::download_and_scan_image;
use super::HandlerContext;

/// Handle photo messages; the largest size is scanned
pub async fn handle_photo_message(ctx: &HandlerContext<'_>) -> Result<()> {
    debug!(telegram_id = %ctx.telegram_id, "Received photo message from user");

    if let Some(largest_photo) = ctx.msg.photo().and_then(|photos| photos.last()) {
        download_and_scan_image(ctx, largest_photo.file.id.clone(), "processing-photo").await?;
    }
    Ok(())
}

/// Handle document messages; only image MIME types are scanned
pub async fn handle_document_message(ctx: &HandlerContext<'_>) -> Result<()> {
    let Some(doc) = ctx.msg.document() else {
        return Ok(());
    };

    match &doc.mime_type {
        Some(mime_type) if mime_type.to_string().starts_with("image/") => {
            debug!(telegram_id = %ctx.telegram_id, mime_type = %mime_type, "Received image document from user");
            download_and_scan_image(ctx, doc.file.id.clone(), "processing-document").await
        }
        Some(mime_type) => {
            debug!(telegram_id = %ctx.telegram_id, mime_type = %mime_type, "Received non-image document from user");
            ctx.reply(ctx.t("error-unsupported-format")).await
        }
        None => {
            debug!(telegram_id = %ctx.telegram_id, "Received document without mime type from user");
            ctx.reply(ctx.t("error-no-mime-type")).await
        }
    }
}
