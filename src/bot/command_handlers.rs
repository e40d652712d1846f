//! Command Handlers module for processing bot commands

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use super::HandlerContext;
use crate::analysis::PERSONAL_ALLERGEN_CATALOG;
use crate::db;
use crate::notifications::{
    alert_is_silent, format_history_page, format_history_page_footer, format_personal_alert,
    format_profile, format_scan_summary, format_settings, history_page_count,
    should_send_personal_alert,
};
use crate::scanner::ScanError;
use crate::settings::{Toggle, UserSettings};
use crate::validation::{
    parse_allergen_list, parse_history_args, parse_language, parse_retention_days, parse_scan_id,
    parse_setup_args, parse_severity, parse_theme, parse_toggle, validate_allergen_name,
    HistoryQuery,
};

/// Split `/cmd@BotName args` into the lowercase command and its arguments
///
/// Returns `None` when the text is not a command.
pub fn split_command(text: &str) -> Option<(String, &str)> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let (head, args) = match text.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (text, ""),
    };
    let command = head.split('@').next().unwrap_or(head).to_lowercase();
    Some((command, args))
}

/// Route a command to its handler
pub async fn handle_command(ctx: &HandlerContext<'_>, command: &str, args: &str) -> Result<()> {
    debug!(telegram_id = %ctx.telegram_id, command = %command, "Handling command");

    match command {
        "/start" => handle_start_command(ctx).await,
        "/help" => handle_help_command(ctx).await,
        "/check" => handle_check_command(ctx, args).await,
        "/profile" => handle_profile_command(ctx).await,
        "/setup" => handle_setup_command(ctx, args).await,
        "/allergens" => handle_allergens_command(ctx).await,
        "/allergens_set" => handle_allergens_set_command(ctx, args).await,
        "/allergen_add" => handle_allergen_add_command(ctx, args).await,
        "/allergen_remove" => handle_allergen_remove_command(ctx, args).await,
        "/catalog" => handle_catalog_command(ctx).await,
        "/history" => handle_history_command(ctx, args).await,
        "/history_allergens" => handle_history_allergens_command(ctx).await,
        "/alerts" => handle_alerts_command(ctx).await,
        "/delete" => handle_delete_command(ctx, args).await,
        "/clear_history" => handle_clear_history_command(ctx, args).await,
        "/settings" => handle_settings_command(ctx).await,
        "/notifications" => handle_toggle_command(ctx, Toggle::Notifications, args).await,
        "/sound" => handle_toggle_command(ctx, Toggle::Sound, args).await,
        "/vibration" => handle_toggle_command(ctx, Toggle::Vibration, args).await,
        "/autosave" => handle_toggle_command(ctx, Toggle::AutoSave, args).await,
        "/threshold" => handle_threshold_command(ctx, args).await,
        "/language" => handle_language_command(ctx, args).await,
        "/theme" => handle_theme_command(ctx, args).await,
        _ => ctx.reply(ctx.t("unknown-command")).await,
    }
}

/// Handle the /start command
pub async fn handle_start_command(ctx: &HandlerContext<'_>) -> Result<()> {
    db::get_or_create_settings(&ctx.app.pool, ctx.telegram_id, &ctx.language).await?;
    let profile = db::get_profile(&ctx.app.pool, ctx.telegram_id).await?;

    let mut message = format!(
        "👋 {}\n\n{}\n\n{}",
        ctx.t("welcome-title"),
        ctx.t("welcome-description"),
        ctx.t("welcome-send-image")
    );
    if !profile.map(|p| p.onboarding_completed).unwrap_or(false) {
        message.push_str("\n\n");
        message.push_str(&ctx.t("welcome-setup-hint"));
    }
    ctx.reply(message).await
}

/// Handle the /help command
pub async fn handle_help_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let help_message = [
        ctx.t("help-title"),
        ctx.t("help-scanning"),
        ctx.t("help-profile"),
        ctx.t("help-history"),
        ctx.t("help-settings"),
    ]
    .join("\n\n");
    ctx.reply(help_message).await
}

/// Send the summary and, when due, the personal alert for a finished scan
pub async fn send_scan_result(
    ctx: &HandlerContext<'_>,
    result: std::result::Result<crate::analysis::AnalysisOutcome, ScanError>,
) -> Result<()> {
    match result {
        Ok(outcome) => {
            let settings = ctx.effective_settings();
            let summary =
                format_scan_summary(&outcome, &settings, &ctx.app.localization, &ctx.language);
            ctx.reply(summary).await?;

            if should_send_personal_alert(&outcome, &settings) {
                let alert = format_personal_alert(&outcome, &ctx.app.localization, &ctx.language);
                ctx.reply_with_sound(alert, alert_is_silent(&settings)).await?;
                crate::observability::record_personal_alert();
                info!(telegram_id = %ctx.telegram_id, "Personal allergen alert sent");
            }
            Ok(())
        }
        Err(err) => {
            debug!(telegram_id = %ctx.telegram_id, error = %err, "Scan ended without result");
            ctx.reply(ctx.t(err.user_message_key())).await
        }
    }
}

/// Handle /check <text>
pub async fn handle_check_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    if args.is_empty() {
        return ctx.reply(ctx.t("check-usage")).await;
    }

    let result = ctx
        .app
        .scanner
        .analyze_text_for_user(ctx.telegram_id, args)
        .await;
    send_scan_result(ctx, result).await
}

/// Handle /profile
pub async fn handle_profile_command(ctx: &HandlerContext<'_>) -> Result<()> {
    match db::get_profile(&ctx.app.pool, ctx.telegram_id).await? {
        Some(profile) => {
            ctx.reply(format_profile(&profile, &ctx.app.localization, &ctx.language))
                .await
        }
        None => ctx.reply(ctx.t("profile-not-found")).await,
    }
}

/// Handle /setup <first>;<last>;<email>;<allergens>
pub async fn handle_setup_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    if args.is_empty() {
        return ctx.reply(ctx.t("setup-usage")).await;
    }

    let details = match parse_setup_args(args) {
        Ok(details) => details,
        Err(key) => {
            crate::errors::error_logging::log_validation_error(
                &key,
                "setup",
                Some(ctx.telegram_id),
                "setup_args",
                Some(args),
            );
            return ctx.reply(ctx.t(key)).await;
        }
    };

    let profile =
        db::initialize_new_user(&ctx.app.pool, ctx.telegram_id, &details, &ctx.language).await?;
    info!(telegram_id = %ctx.telegram_id, allergens = profile.personal_allergens.len(), "Onboarding completed");

    let name = profile.display_name();
    ctx.reply(ctx.t_args("setup-complete", &[("name", name.as_str())]))
        .await
}

/// Handle /allergens
pub async fn handle_allergens_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let allergens = db::get_personal_allergens(&ctx.app.pool, ctx.telegram_id).await?;
    if allergens.is_empty() {
        return ctx.reply(ctx.t("allergens-none")).await;
    }

    let list = allergens.join(", ");
    ctx.reply(ctx.t_args("allergens-list", &[("allergens", list.as_str())]))
        .await
}

/// Handle /allergens_set <a, b, ...>; `-` clears the list
pub async fn handle_allergens_set_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    if args.is_empty() {
        return ctx.reply(ctx.t("allergens-set-usage")).await;
    }

    if args == "-" {
        db::update_personal_allergens(&ctx.app.pool, ctx.telegram_id, &[]).await?;
        return ctx.reply(ctx.t("allergens-cleared")).await;
    }

    let allergens = match parse_allergen_list(args) {
        Ok(allergens) => allergens,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let stored = db::update_personal_allergens(&ctx.app.pool, ctx.telegram_id, &allergens).await?;
    let list = stored.join(", ");
    ctx.reply(ctx.t_args("allergens-updated", &[("allergens", list.as_str())]))
        .await
}

/// Handle /allergen_add <name>
pub async fn handle_allergen_add_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let name = match validate_allergen_name(args) {
        Ok(name) => name,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let key = if db::add_personal_allergen(&ctx.app.pool, ctx.telegram_id, &name).await? {
        "allergen-added"
    } else {
        "allergen-already-present"
    };
    ctx.reply(ctx.t_args(key, &[("allergen", name.as_str())]))
        .await
}

/// Handle /allergen_remove <name>
pub async fn handle_allergen_remove_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let name = match validate_allergen_name(args) {
        Ok(name) => name,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let key = if db::remove_personal_allergen(&ctx.app.pool, ctx.telegram_id, &name).await? {
        "allergen-removed"
    } else {
        "allergen-not-found"
    };
    ctx.reply(ctx.t_args(key, &[("allergen", name.as_str())]))
        .await
}

/// Handle /catalog
pub async fn handle_catalog_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let mut message = ctx.t("catalog-title");
    for allergen in PERSONAL_ALLERGEN_CATALOG {
        message.push_str(&format!("\n• {}", allergen));
    }
    message.push_str("\n\n");
    message.push_str(&ctx.t("catalog-hint"));
    ctx.reply(message).await
}

/// Handle /history [query]
pub async fn handle_history_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let page_size = ctx.app.scan_config.history_page_size;

    let message = match parse_history_args(args) {
        Err(key) => ctx.t(key),
        Ok(HistoryQuery::Page(page)) => {
            let total = db::count_scans(&ctx.app.pool, ctx.telegram_id).await?;
            let pages = history_page_count(total, page_size);
            if total > 0 && page > pages {
                let page = page.to_string();
                let pages = pages.to_string();
                ctx.t_args(
                    "history-page-out-of-range",
                    &[("page", page.as_str()), ("pages", pages.as_str())],
                )
            } else {
                let offset = (page - 1) * page_size;
                let records =
                    db::list_scans(&ctx.app.pool, ctx.telegram_id, page_size, offset).await?;
                let mut message = format_history_page(
                    &records,
                    total,
                    "history-header",
                    &ctx.app.localization,
                    &ctx.language,
                );
                if let Some(footer) =
                    format_history_page_footer(page, pages, &ctx.app.localization, &ctx.language)
                {
                    message.push_str("\n\n");
                    message.push_str(&footer);
                }
                message
            }
        }
        Ok(HistoryQuery::Search(query)) => {
            let records =
                db::search_scans(&ctx.app.pool, ctx.telegram_id, &query, page_size).await?;
            format_history_page(
                &records,
                records.len() as i64,
                "history-search-header",
                &ctx.app.localization,
                &ctx.language,
            )
        }
    };
    ctx.reply(message).await
}

/// Handle /history_allergens
pub async fn handle_history_allergens_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let page_size = ctx.app.scan_config.history_page_size;
    let records = db::list_scans_with_allergens(&ctx.app.pool, ctx.telegram_id, page_size).await?;
    let message = format_history_page(
        &records,
        records.len() as i64,
        "history-allergens-header",
        &ctx.app.localization,
        &ctx.language,
    );
    ctx.reply(message).await
}

/// Handle /alerts
pub async fn handle_alerts_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let page_size = ctx.app.scan_config.history_page_size;
    let records =
        db::list_scans_with_personal_allergens(&ctx.app.pool, ctx.telegram_id, page_size).await?;
    let message = format_history_page(
        &records,
        records.len() as i64,
        "history-alerts-header",
        &ctx.app.localization,
        &ctx.language,
    );
    ctx.reply(message).await
}

/// Handle /delete <id>
pub async fn handle_delete_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let scan_id = match parse_scan_id(args) {
        Ok(id) => id,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let id = scan_id.to_string();
    let key = if db::delete_scan(&ctx.app.pool, ctx.telegram_id, scan_id).await? {
        "history-deleted"
    } else {
        "history-not-found"
    };
    ctx.reply(ctx.t_args(key, &[("id", id.as_str())])).await
}

/// Handle /clear_history [days]
///
/// Without an argument every scan is removed, with one only scans older than
/// that many days.
pub async fn handle_clear_history_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let deleted = if args.is_empty() {
        db::delete_all_scans(&ctx.app.pool, ctx.telegram_id).await?
    } else {
        let days = match parse_retention_days(args) {
            Ok(days) => days,
            Err(key) => return ctx.reply(ctx.t(key)).await,
        };
        let cutoff = Utc::now() - Duration::days(days);
        db::delete_scans_before(&ctx.app.pool, ctx.telegram_id, cutoff).await?
    };

    let count = deleted.to_string();
    ctx.reply(ctx.t_args("history-cleared", &[("count", count.as_str())]))
        .await
}

async fn load_settings(ctx: &HandlerContext<'_>) -> Result<UserSettings> {
    db::get_or_create_settings(&ctx.app.pool, ctx.telegram_id, &ctx.language).await
}

/// Handle /settings
pub async fn handle_settings_command(ctx: &HandlerContext<'_>) -> Result<()> {
    let settings = load_settings(ctx).await?;
    let mut message = format_settings(&settings, &ctx.app.localization, &ctx.language);
    message.push_str("\n\n");
    message.push_str(&ctx.t("settings-hint"));
    ctx.reply(message).await
}

/// Handle /notifications, /sound, /vibration and /autosave
pub async fn handle_toggle_command(
    ctx: &HandlerContext<'_>,
    toggle: Toggle,
    args: &str,
) -> Result<()> {
    let enabled = match parse_toggle(args) {
        Ok(enabled) => enabled,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let mut settings = load_settings(ctx).await?;
    toggle.apply(&mut settings, enabled);
    db::update_settings(&ctx.app.pool, ctx.telegram_id, &settings).await?;

    let setting = ctx.t(toggle.label_key());
    let value = ctx.t(if enabled { "value-on" } else { "value-off" });
    ctx.reply(ctx.t_args(
        "setting-updated",
        &[("setting", setting.as_str()), ("value", value.as_str())],
    ))
    .await
}

/// Handle /threshold low|medium|high
pub async fn handle_threshold_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let threshold = match parse_severity(args) {
        Ok(threshold) => threshold,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let mut settings = load_settings(ctx).await?;
    settings.warning_threshold = threshold;
    db::update_settings(&ctx.app.pool, ctx.telegram_id, &settings).await?;

    let label = ctx.t(threshold.label_key());
    ctx.reply(ctx.t_args("threshold-updated", &[("threshold", label.as_str())]))
        .await
}

/// Handle /language ro|en; the confirmation is sent in the new language
pub async fn handle_language_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let language = match parse_language(args) {
        Ok(language) => language,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let mut settings = load_settings(ctx).await?;
    settings.language = language.clone();
    db::update_settings(&ctx.app.pool, ctx.telegram_id, &settings).await?;

    let message = ctx
        .app
        .localization
        .get_message_in_language("language-updated", &language, None);
    ctx.reply(message).await
}

/// Handle /theme light|dark|system
pub async fn handle_theme_command(ctx: &HandlerContext<'_>, args: &str) -> Result<()> {
    let theme = match parse_theme(args) {
        Ok(theme) => theme,
        Err(key) => return ctx.reply(ctx.t(key)).await,
    };

    let mut settings = load_settings(ctx).await?;
    settings.theme = theme;
    db::update_settings(&ctx.app.pool, ctx.telegram_id, &settings).await?;

    let label = ctx.t(theme.label_key());
    ctx.reply(ctx.t_args("theme-updated", &[("theme", label.as_str())]))
        .await
}
