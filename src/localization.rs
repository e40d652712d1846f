use anyhow::{Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

use crate::settings::{DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};

/// Language used when a key is missing from the requested locale
pub const FALLBACK_LANGUAGE: &str = "en";

const EMBEDDED_RO: &str = include_str!("../locales/ro/main.ftl");
const EMBEDDED_EN: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for IngredientGuard
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager
    ///
    /// Resources come from `$LOCALES_DIR/<locale>/main.ftl` when that
    /// variable is set, otherwise from the files compiled into the binary.
    pub fn new() -> Result<Self> {
        let override_dir = std::env::var("LOCALES_DIR").ok();
        let mut bundles = HashMap::new();

        for locale_str in SUPPORTED_LANGUAGES {
            let source = match &override_dir {
                Some(dir) => Self::read_locale_file(Path::new(dir), locale_str)?,
                None => Self::embedded_source(locale_str).to_string(),
            };
            let bundle = Self::create_bundle(locale_str, source)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        tracing::debug!(locales = bundles.len(), "Localization bundles loaded");
        Ok(Self { bundles })
    }

    fn embedded_source(locale: &str) -> &'static str {
        match locale {
            "en" => EMBEDDED_EN,
            _ => EMBEDDED_RO,
        }
    }

    fn read_locale_file(dir: &Path, locale: &str) -> Result<String> {
        let path = dir.join(locale).join("main.ftl");
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read locale file {}", path.display()))
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale_str: &str, source: String) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = locale_str
            .parse()
            .with_context(|| format!("Invalid locale identifier '{}'", locale_str))?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source).map_err(|(_, errors)| {
            anyhow::anyhow!("Failed to parse {} resource: {:?}", locale_str, errors)
        })?;
        bundle.add_resource(resource).map_err(|errors| {
            anyhow::anyhow!("Duplicate messages in {} resource: {:?}", locale_str, errors)
        })?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    ///
    /// Unknown languages resolve to the default locale; keys missing from a
    /// locale fall back to English.
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = if self.is_language_supported(language) {
            language
        } else {
            DEFAULT_LANGUAGE
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(
                args.iter()
                    .map(|(k, v)| (*k, FluentValue::from(v.to_string()))),
            )
        });

        [language, FALLBACK_LANGUAGE]
            .iter()
            .find_map(|lang| self.format_from_bundle(lang, key, fluent_args.as_ref()))
            .unwrap_or_else(|| format!("Missing translation: {}", key))
    }

    fn format_from_bundle(
        &self,
        language: &str,
        key: &str,
        args: Option<&FluentArgs>,
    ) -> Option<String> {
        let bundle = self.bundles.get(language)?;
        let pattern = bundle.get_message(key)?.value()?;

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::debug!(key = %key, language = %language, errors = ?errors, "Fluent formatting reported errors");
        }
        Some(value.into_owned())
    }

    /// Get a localized message with arguments in a specific language
    pub fn get_message_with_args_in_language(
        &self,
        key: &str,
        language: &str,
        args: &[(&str, &str)],
    ) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }
}

/// Create the shared localization manager
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}

/// Convenience function to get a localized message in user's language
pub fn t_lang(localization: &LocalizationManager, key: &str, language_code: Option<&str>) -> String {
    let language = detect_language(language_code);
    localization.get_message_in_language(key, &language, None)
}

/// Convenience function to get a localized message with arguments in user's language
pub fn t_args_lang(
    localization: &LocalizationManager,
    key: &str,
    args: &[(&str, &str)],
    language_code: Option<&str>,
) -> String {
    let language = detect_language(language_code);
    localization.get_message_with_args_in_language(key, &language, args)
}

/// Detect the appropriate language based on user's Telegram language code
pub fn detect_language(language_code: Option<&str>) -> String {
    if let Some(code) = language_code {
        // "ro-RO" -> "ro", "en_US" -> "en"
        let lang = code
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
            return lang;
        }
    }

    DEFAULT_LANGUAGE.to_string()
}

/// Pick the reply language: stored preference first, then Telegram's code,
/// then `default_language`
pub fn resolve_user_language(
    stored: Option<&str>,
    telegram_code: Option<&str>,
    default_language: &str,
) -> String {
    if let Some(lang) = stored.filter(|lang| SUPPORTED_LANGUAGES.contains(lang)) {
        return lang.to_string();
    }

    match telegram_code {
        Some(code) if telegram_code_supported(code) => detect_language(Some(code)),
        _ => default_language.to_string(),
    }
}

fn telegram_code_supported(code: &str) -> bool {
    let primary = code.split(['-', '_']).next().unwrap_or_default().trim().to_lowercase();
    SUPPORTED_LANGUAGES.contains(&primary.as_str())
}
