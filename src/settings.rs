//! User preference types shared by persistence, notifications and the bot.

use crate::analysis::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Locales the bot ships translations for
pub const SUPPORTED_LANGUAGES: &[&str] = &["ro", "en"];

pub const DEFAULT_LANGUAGE: &str = "ro";

/// Display theme preference, kept for clients that render scan history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "LIGHT",
            Theme::Dark => "DARK",
            Theme::System => "SYSTEM",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
            Theme::System => "theme-system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" | "luminos" => Ok(Theme::Light),
            "dark" | "întunecat" | "intunecat" => Ok(Theme::Dark),
            "system" | "sistem" => Ok(Theme::System),
            _ => Err("error-invalid-theme"),
        }
    }
}

/// Per-user notification and display preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub auto_save_scans: bool,
    /// Allergens below this severity are left out of scan summaries
    pub warning_threshold: Severity,
    pub language: String,
    pub theme: Theme,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
            auto_save_scans: true,
            warning_threshold: Severity::Medium,
            language: DEFAULT_LANGUAGE.to_string(),
            theme: Theme::System,
        }
    }
}

impl UserSettings {
    /// Default settings in the given language
    pub fn with_language(language: &str) -> Self {
        Self {
            language: normalize_language(language),
            ..Self::default()
        }
    }
}

/// A single on/off preference addressable from a bot command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Notifications,
    Sound,
    Vibration,
    AutoSave,
}

impl Toggle {
    pub fn apply(&self, settings: &mut UserSettings, enabled: bool) {
        match self {
            Toggle::Notifications => settings.notifications_enabled = enabled,
            Toggle::Sound => settings.sound_enabled = enabled,
            Toggle::Vibration => settings.vibration_enabled = enabled,
            Toggle::AutoSave => settings.auto_save_scans = enabled,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Toggle::Notifications => "setting-notifications",
            Toggle::Sound => "setting-sound",
            Toggle::Vibration => "setting-vibration",
            Toggle::AutoSave => "setting-autosave",
        }
    }
}

/// Map a Telegram language code (`ro-RO`, `en_US`, `EN`) to a supported locale
///
/// Unknown codes fall back to Romanian.
pub fn normalize_language(code: &str) -> String {
    let primary = code
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    if SUPPORTED_LANGUAGES.contains(&primary.as_str()) {
        primary
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

/// Whether `code` names a supported locale exactly
pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code.trim().to_lowercase().as_str())
}
