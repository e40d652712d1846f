//! Image Processing module: download a Telegram file and scan it

use anyhow::Result;
use std::io::Write;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::command_handlers::send_scan_result;
use super::HandlerContext;
use crate::errors::error_logging;

/// RAII guard for temporary files that ensures cleanup on drop
pub struct TempFileGuard {
    path: String,
}

impl TempFileGuard {
    pub fn new(path: String) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Display for TempFileGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            error_logging::log_filesystem_error(&e, "cleanup_temp_file", Some(&self.path), None);
        } else {
            debug!(path = %self.path, "Temporary file cleaned up successfully in drop");
        }
    }
}

/// Write downloaded bytes to a temp file owned by the returned guard
pub fn persist_temp_image(bytes: &[u8]) -> Result<TempFileGuard> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.as_file_mut().write_all(bytes)?;
    let (_, path) = temp_file.keep()?;
    Ok(TempFileGuard::new(path.to_string_lossy().to_string()))
}

/// Download a Telegram file, refusing anything over `max_file_size`
pub async fn download_file(bot: &Bot, file_id: FileId, max_file_size: u64) -> Result<TempFileGuard> {
    let file = bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url).await?.error_for_status()?;

    if let Some(content_length) = response.content_length() {
        if content_length > max_file_size {
            return Err(anyhow::anyhow!(
                "File too large: {} bytes (maximum allowed: {} bytes)",
                content_length,
                max_file_size
            ));
        }
    }

    let bytes = response.bytes().await?;
    persist_temp_image(&bytes)
}

/// Download, scan and answer one image
pub async fn download_and_scan_image(
    ctx: &HandlerContext<'_>,
    file_id: FileId,
    processing_key: &str,
) -> Result<()> {
    ctx.reply(ctx.t(processing_key)).await?;

    let image_ref = file_id.0.clone();
    let max_file_size = ctx.app.scanner.ocr_config().max_file_size;

    let temp_file_guard = match download_file(ctx.bot, file_id, max_file_size).await {
        Ok(guard) => {
            debug!(telegram_id = %ctx.telegram_id, temp_path = %guard, "Image downloaded successfully");
            guard
        }
        Err(e) => {
            error_logging::log_network_error(
                &e,
                "download_image_file",
                None,
                Some(ctx.telegram_id),
            );
            return ctx.reply(ctx.t("error-download-failed")).await;
        }
    };

    info!(telegram_id = %ctx.telegram_id, "Scanning downloaded image");
    let result = ctx
        .app
        .scanner
        .scan_image(ctx.telegram_id, temp_file_guard.path(), Some(image_ref))
        .await;

    // The temp file is removed when the guard drops, after the scan
    drop(temp_file_guard);

    send_scan_result(ctx, result).await
}
