//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, Instrument};

use super::command_handlers::{handle_command, split_command};
use super::media_handlers::{handle_document_message, handle_photo_message};
use super::{BotContext, HandlerContext};
use crate::errors::error_logging;
use crate::observability;

/// Kind of incoming message, used for routing and metrics
pub fn message_type(msg: &Message) -> &'static str {
    if msg.text().is_some() {
        "text"
    } else if msg.photo().is_some() {
        "photo"
    } else if msg.document().is_some() {
        "document"
    } else {
        "unsupported"
    }
}

async fn handle_text_message(ctx: &HandlerContext<'_>, text: &str) -> Result<()> {
    debug!(telegram_id = %ctx.telegram_id, message_length = text.len(), "Received text message from user");

    match split_command(text) {
        Some((command, args)) => handle_command(ctx, &command, args).await,
        None => ctx.reply(ctx.t("text-hint")).await,
    }
}

async fn handle_unsupported_message(ctx: &HandlerContext<'_>) -> Result<()> {
    debug!(telegram_id = %ctx.telegram_id, "Received unsupported message type from user");

    let help_message = format!(
        "{}\n\n{}",
        ctx.t("unsupported-title"),
        ctx.t("unsupported-description")
    );
    ctx.reply(help_message).await
}

/// Entry point for every message update
pub async fn message_handler(bot: Bot, msg: Message, app: Arc<BotContext>) -> Result<()> {
    let span = observability::telegram_span(
        "message_handler",
        msg.from.as_ref().map(|u| u.id.0 as i64),
    );

    async {
        let start_time = std::time::Instant::now();
        let kind = message_type(&msg);
        let ctx = HandlerContext::load(&bot, &msg, &app).await;

        let result = match kind {
            "text" => handle_text_message(&ctx, msg.text().unwrap_or_default()).await,
            "photo" => handle_photo_message(&ctx).await,
            "document" => handle_document_message(&ctx).await,
            _ => handle_unsupported_message(&ctx).await,
        };

        observability::record_telegram_performance_metrics(
            kind,
            start_time.elapsed(),
            kind == "photo" || kind == "document",
        );

        if let Err(e) = &result {
            error_logging::log_internal_error(e, "bot", "message_handler", Some(ctx.telegram_id));
            observability::record_error_metrics("handler", "bot");
            // Best effort: the user still gets an answer
            if let Err(send_err) = ctx.reply(ctx.t("error-generic")).await {
                error_logging::log_network_error(
                    &send_err,
                    "send_error_reply",
                    None,
                    Some(ctx.telegram_id),
                );
            }
        }
        Ok(())
    }
    .instrument(span)
    .await
}
