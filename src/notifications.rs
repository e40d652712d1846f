//! Chat message builders for scan results, alerts, history, profile and settings.
//!
//! Everything here is pure: handlers decide when to send, these functions only
//! decide what the text says.

use crate::analysis::{AllergenMatch, AnalysisOutcome};
use crate::db::{ScanRecord, UserProfile};
use crate::localization::LocalizationManager;
use crate::settings::UserSettings;

/// Characters of scanned text shown per history entry
const HISTORY_PREVIEW_CHARS: usize = 60;

/// Whether a personal allergen alert should be sent for this scan
pub fn should_send_personal_alert(outcome: &AnalysisOutcome, settings: &UserSettings) -> bool {
    outcome.personal_match_detected && settings.notifications_enabled
}

/// Whether the personal alert goes out without a notification sound
pub fn alert_is_silent(settings: &UserSettings) -> bool {
    !settings.sound_enabled
}

/// Build the personal allergen alert
pub fn format_personal_alert(
    outcome: &AnalysisOutcome,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let mut message = localization.get_message_in_language("personal-alert-title", language, None);
    message.push('\n');
    message.push_str(&localization.get_message_in_language("personal-alert-body", language, None));
    message.push('\n');

    for name in &outcome.personal_match_names {
        message.push_str(&format!("\n• {}", name));
    }

    message.push_str("\n\n");
    message.push_str(&localization.get_message_in_language(
        "personal-alert-footer",
        language,
        None,
    ));
    message
}

fn format_allergen_line(
    allergen: &AllergenMatch,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    format!(
        "{} {} ({})",
        allergen.severity.badge(),
        allergen.name,
        localization.get_message_in_language(allergen.severity.label_key(), language, None)
    )
}

/// Build the reply sent after every scan
///
/// Allergens below the user's warning threshold are counted but not listed.
pub fn format_scan_summary(
    outcome: &AnalysisOutcome,
    settings: &UserSettings,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let mut sections = vec![localization.get_message_in_language(
        "scan-complete-title",
        language,
        None,
    )];

    let headline = if outcome.personal_match_detected {
        let names = outcome.personal_match_names.join(", ");
        localization.get_message_with_args_in_language(
            "scan-summary-personal",
            language,
            &[("allergens", names.as_str())],
        )
    } else if outcome.has_allergens() {
        let count = outcome.allergens.len().to_string();
        localization.get_message_with_args_in_language(
            "scan-summary-allergens-found",
            language,
            &[("count", count.as_str())],
        )
    } else {
        localization.get_message_in_language("scan-summary-no-allergens", language, None)
    };
    sections.push(headline);

    if outcome.has_allergens() {
        let shown = outcome.allergens_at_or_above(settings.warning_threshold);
        let hidden = outcome.allergens.len() - shown.len();

        let mut block = String::new();
        if !shown.is_empty() {
            block.push_str(&localization.get_message_in_language(
                "scan-allergens-header",
                language,
                None,
            ));
            for allergen in &shown {
                block.push('\n');
                block.push_str(&format_allergen_line(allergen, localization, language));
            }
        }
        if hidden > 0 {
            if !block.is_empty() {
                block.push('\n');
            }
            let hidden = hidden.to_string();
            let threshold = localization.get_message_in_language(
                settings.warning_threshold.label_key(),
                language,
                None,
            );
            block.push_str(&localization.get_message_with_args_in_language(
                "scan-allergens-below-threshold",
                language,
                &[("count", hidden.as_str()), ("threshold", threshold.as_str())],
            ));
        }
        sections.push(block);
    }

    if outcome.ingredients.is_empty() {
        sections.push(localization.get_message_in_language("scan-no-ingredients", language, None));
    } else {
        let mut block =
            localization.get_message_in_language("scan-ingredients-header", language, None);
        for ingredient in &outcome.ingredients {
            block.push_str(&format!("\n• {}", ingredient.text));
            if ingredient.is_allergen {
                block.push_str(" ⚠️");
            }
        }
        sections.push(block);
    }

    sections.join("\n\n")
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= HISTORY_PREVIEW_CHARS {
        single_line
    } else {
        let cut: String = single_line.chars().take(HISTORY_PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

/// One line block describing a stored scan
pub fn format_history_entry(
    record: &ScanRecord,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let status = if record.has_personal_allergens {
        let names = record.personal_allergens_found.join(", ");
        localization.get_message_with_args_in_language(
            "history-entry-personal",
            language,
            &[("allergens", names.as_str())],
        )
    } else if record.has_allergens {
        let names = record
            .allergens
            .iter()
            .map(|allergen| format!("{} {}", allergen.severity.badge(), allergen.name))
            .collect::<Vec<_>>()
            .join(", ");
        localization.get_message_with_args_in_language(
            "history-entry-allergens",
            language,
            &[("allergens", names.as_str())],
        )
    } else {
        localization.get_message_in_language("history-entry-clean", language, None)
    };

    format!(
        "#{} · {}\n{}\n“{}”",
        record.id,
        record.scanned_at.format("%d.%m.%Y %H:%M"),
        status,
        preview(&record.full_text)
    )
}

/// A page of history entries with a header showing the total
pub fn format_history_page(
    records: &[ScanRecord],
    total: i64,
    header_key: &str,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    if records.is_empty() {
        return localization.get_message_in_language("history-empty", language, None);
    }

    let shown = records.len().to_string();
    let total = total.to_string();
    let mut message = localization.get_message_with_args_in_language(
        header_key,
        language,
        &[("shown", shown.as_str()), ("total", total.as_str())],
    );

    for record in records {
        message.push_str("\n\n");
        message.push_str(&format_history_entry(record, localization, language));
    }
    message
}

/// Number of history pages needed for `total` scans
pub fn history_page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 1;
    }
    (total + page_size - 1) / page_size
}

/// Page position line for `/history`, `None` when everything fits one page
pub fn format_history_page_footer(
    page: i64,
    pages: i64,
    localization: &LocalizationManager,
    language: &str,
) -> Option<String> {
    if pages <= 1 {
        return None;
    }

    let current = page.to_string();
    let count = pages.to_string();
    let mut footer = localization.get_message_with_args_in_language(
        "history-page-footer",
        language,
        &[("page", current.as_str()), ("pages", count.as_str())],
    );
    if page < pages {
        let next = (page + 1).to_string();
        footer.push('\n');
        footer.push_str(&localization.get_message_with_args_in_language(
            "history-page-next",
            language,
            &[("next", next.as_str())],
        ));
    }
    Some(footer)
}

/// Summary of the user's profile for `/profile`
pub fn format_profile(
    profile: &UserProfile,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let none = localization.get_message_in_language("profile-none", language, None);
    let name = profile.display_name();
    let name = if name.is_empty() { none.clone() } else { name };
    let email = if profile.email.is_empty() {
        none.clone()
    } else {
        profile.email.clone()
    };
    let allergens = if profile.personal_allergens.is_empty() {
        none
    } else {
        profile.personal_allergens.join(", ")
    };
    let status_key = if profile.onboarding_completed {
        "profile-onboarding-complete"
    } else {
        "profile-onboarding-pending"
    };
    let status = localization.get_message_in_language(status_key, language, None);

    localization.get_message_with_args_in_language(
        "profile-summary",
        language,
        &[
            ("name", name.as_str()),
            ("email", email.as_str()),
            ("allergens", allergens.as_str()),
            ("status", status.as_str()),
        ],
    )
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "✅"
    } else {
        "❌"
    }
}

/// Summary of the user's settings for `/settings`
pub fn format_settings(
    settings: &UserSettings,
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let threshold =
        localization.get_message_in_language(settings.warning_threshold.label_key(), language, None);
    let theme = localization.get_message_in_language(settings.theme.label_key(), language, None);
    let language_name =
        localization.get_message_in_language(&format!("language-{}", settings.language), language, None);

    localization.get_message_with_args_in_language(
        "settings-summary",
        language,
        &[
            ("notifications", on_off(settings.notifications_enabled)),
            ("sound", on_off(settings.sound_enabled)),
            ("vibration", on_off(settings.vibration_enabled)),
            ("autosave", on_off(settings.auto_save_scans)),
            ("threshold", threshold.as_str()),
            ("language", language_name.as_str()),
            ("theme", theme.as_str()),
        ],
    )
}
