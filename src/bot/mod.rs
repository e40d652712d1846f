//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: dispatches incoming messages by kind
//! - `command_handlers`: the text commands (profile, allergens, history, settings)
//! - `media_handlers`: photo and image document messages
//! - `image_processing`: download, scan and reply for one image

pub mod command_handlers;
pub mod image_processing;
pub mod media_handlers;
pub mod message_handler;

use std::sync::Arc;

use sqlx::PgPool;
use teloxide::prelude::*;

use crate::config::ScanConfig;
use crate::localization::{resolve_user_language, LocalizationManager};
use crate::scanner::ScanService;
use crate::settings::UserSettings;

/// Shared dependencies for every handler
pub struct BotContext {
    pub pool: Arc<PgPool>,
    pub localization: Arc<LocalizationManager>,
    pub scanner: Arc<ScanService>,
    pub scan_config: ScanConfig,
}

/// Per-message context: who is talking and in which language
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub msg: &'a Message,
    pub app: &'a BotContext,
    pub telegram_id: i64,
    /// Stored settings, if the user has any yet
    pub settings: Option<UserSettings>,
    pub language: String,
}

impl<'a> HandlerContext<'a> {
    /// Build the context, reading stored settings for the reply language
    ///
    /// A failed settings read is logged and treated as "no settings".
    pub async fn load(bot: &'a Bot, msg: &'a Message, app: &'a BotContext) -> Self {
        let telegram_id = msg.chat.id.0;
        let settings = match crate::db::get_settings(&app.pool, telegram_id).await {
            Ok(settings) => settings,
            Err(e) => {
                crate::errors::error_logging::log_database_error(
                    &e,
                    "get_settings",
                    Some(telegram_id),
                    None,
                );
                None
            }
        };

        let telegram_code = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.as_deref());
        let language = resolve_user_language(
            settings.as_ref().map(|s| s.language.as_str()),
            telegram_code,
            &app.scan_config.default_language,
        );

        Self {
            bot,
            msg,
            app,
            telegram_id,
            settings,
            language,
        }
    }

    /// Stored settings or defaults in the reply language
    pub fn effective_settings(&self) -> UserSettings {
        self.settings
            .clone()
            .unwrap_or_else(|| UserSettings::with_language(&self.language))
    }

    pub fn t(&self, key: &str) -> String {
        self.app
            .localization
            .get_message_in_language(key, &self.language, None)
    }

    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.app
            .localization
            .get_message_with_args_in_language(key, &self.language, args)
    }

    pub async fn reply(&self, text: impl Into<String>) -> anyhow::Result<()> {
        self.bot.send_message(self.msg.chat.id, text.into()).await?;
        Ok(())
    }

    /// Send a message, muting the client's notification sound when `silent`
    pub async fn reply_with_sound(&self, text: impl Into<String>, silent: bool) -> anyhow::Result<()> {
        self.bot
            .send_message(self.msg.chat.id, text.into())
            .disable_notification(silent)
            .await?;
        Ok(())
    }
}

pub use message_handler::message_handler;
