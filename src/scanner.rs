//! Scan pipeline: OCR, personal allergen lookup, analysis and history.
//!
//! OCR failures end the scan. The history write happens in a detached task
//! and never affects the result the user sees.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::analysis::{AnalysisOutcome, TextAnalyzer};
use crate::db;
use crate::errors::error_logging;
use crate::instance_manager::OcrInstanceManager;
use crate::ocr::{self, OcrConfig, OcrError};
use crate::settings::UserSettings;

/// Why a scan produced no result
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Text extraction failed; the scan is over
    Ocr(OcrError),
    /// OCR ran but found no text
    NoText,
    /// The user's personal allergens could not be read
    Profile(String),
}

impl ScanError {
    /// Localization key of the message shown to the user
    pub fn user_message_key(&self) -> &'static str {
        match self {
            ScanError::Ocr(err) => err.user_message_key(),
            ScanError::NoText => "error-no-text-found",
            ScanError::Profile(_) => "error-profile-unavailable",
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Ocr(err) => write!(f, "OCR failed: {}", err),
            ScanError::NoText => write!(f, "No text found in image"),
            ScanError::Profile(msg) => write!(f, "Profile lookup failed: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<OcrError> for ScanError {
    fn from(err: OcrError) -> Self {
        ScanError::Ocr(err)
    }
}

/// Whether a finished scan should be written to history
///
/// Users without stored settings get the defaults, which save.
pub fn should_save_history(settings: Option<&UserSettings>) -> bool {
    settings
        .map(|settings| settings.auto_save_scans)
        .unwrap_or_else(|| UserSettings::default().auto_save_scans)
}

/// Runs scans for bot users
pub struct ScanService {
    pool: Arc<PgPool>,
    ocr_config: OcrConfig,
    instance_manager: Arc<OcrInstanceManager>,
    analyzer: TextAnalyzer,
}

impl ScanService {
    pub fn new(
        pool: Arc<PgPool>,
        ocr_config: OcrConfig,
        instance_manager: Arc<OcrInstanceManager>,
    ) -> Self {
        Self {
            pool,
            ocr_config,
            instance_manager,
            analyzer: TextAnalyzer::default(),
        }
    }

    /// Replace the default analyzer
    pub fn with_analyzer(mut self, analyzer: TextAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn ocr_config(&self) -> &OcrConfig {
        &self.ocr_config
    }

    /// Scan an image already saved at `image_path`
    ///
    /// `image_ref` is stored with the history entry (the Telegram file id).
    pub async fn scan_image(
        &self,
        telegram_id: i64,
        image_path: &str,
        image_ref: Option<String>,
    ) -> Result<AnalysisOutcome, ScanError> {
        let span = crate::observability::scan_span("image", telegram_id);
        async move {
            let start = Instant::now();

            let text =
                ocr::extract_text_from_image(image_path, &self.ocr_config, &self.instance_manager)
                    .await?;
            if text.trim().is_empty() {
                info!(telegram_id = %telegram_id, "OCR found no text, nothing to analyse");
                return Err(ScanError::NoText);
            }

            let outcome = self.analyze_and_record(telegram_id, &text, image_ref).await?;
            crate::observability::record_scan_metrics("image", &outcome, start.elapsed());
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Analyse text the user typed or pasted
    ///
    /// Blank text is rejected with [`ScanError::NoText`].
    pub async fn analyze_text_for_user(
        &self,
        telegram_id: i64,
        text: &str,
    ) -> Result<AnalysisOutcome, ScanError> {
        let span = crate::observability::scan_span("text", telegram_id);
        async move {
            if text.trim().is_empty() {
                return Err(ScanError::NoText);
            }
            let start = Instant::now();
            let outcome = self.analyze_and_record(telegram_id, text, None).await?;
            crate::observability::record_scan_metrics("text", &outcome, start.elapsed());
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn analyze_and_record(
        &self,
        telegram_id: i64,
        text: &str,
        image_ref: Option<String>,
    ) -> Result<AnalysisOutcome, ScanError> {
        let personal_allergens = db::get_personal_allergens(&self.pool, telegram_id)
            .await
            .map_err(|e| {
                error_logging::log_database_error(
                    &e,
                    "get_personal_allergens",
                    Some(telegram_id),
                    None,
                );
                ScanError::Profile(format!("{:#}", e))
            })?;

        let outcome = self.analyzer.analyze(text, &personal_allergens);

        info!(
            telegram_id = %telegram_id,
            ingredients = outcome.ingredients.len(),
            allergens = outcome.allergens.len(),
            personal_match = outcome.personal_match_detected,
            "Scan analysed"
        );

        spawn_history_save(Arc::clone(&self.pool), telegram_id, outcome.clone(), image_ref);

        Ok(outcome)
    }
}

/// Write a finished scan to history in the background
///
/// Honours the user's `auto_save_scans` setting. Failures are logged and
/// counted, never retried, and never reach the user.
pub fn spawn_history_save(
    pool: Arc<PgPool>,
    telegram_id: i64,
    outcome: AnalysisOutcome,
    image_ref: Option<String>,
) -> JoinHandle<()> {
    let span = crate::observability::db_span("save_scan", "scan_history");
    tokio::spawn(
        async move {
            let settings = match db::get_settings(&pool, telegram_id).await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(telegram_id = %telegram_id, error = %e, "Could not read settings before saving scan, using defaults");
                    None
                }
            };

            if !should_save_history(settings.as_ref()) {
                debug!(telegram_id = %telegram_id, "Auto-save disabled, scan not stored");
                return;
            }

            match db::save_scan(&pool, telegram_id, &outcome, image_ref.as_deref()).await {
                Ok(scan_id) => {
                    debug!(telegram_id = %telegram_id, scan_id = %scan_id, "Scan stored in history");
                }
                Err(e) => {
                    error_logging::log_history_error(
                        &e,
                        telegram_id,
                        outcome.ingredients.len(),
                        outcome.allergens.len(),
                    );
                    crate::observability::record_history_save_failure();
                }
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;

    #[test]
    fn test_history_saved_by_default() {
        assert!(should_save_history(None));

        let mut settings = UserSettings::default();
        assert!(should_save_history(Some(&settings)));

        settings.auto_save_scans = false;
        assert!(!should_save_history(Some(&settings)));

        settings.warning_threshold = Severity::High;
        assert!(!should_save_history(Some(&settings)));
    }

    #[test]
    fn test_scan_error_message_keys() {
        let err = ScanError::from(OcrError::Timeout("slow".to_string()));
        assert_eq!(err.user_message_key(), "error-ocr-timeout");

        let err = ScanError::Profile("down".to_string());
        assert_eq!(err.user_message_key(), "error-profile-unavailable");
        assert!(err.to_string().contains("down"));
    }
}
