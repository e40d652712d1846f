//! # OCR Instance Manager Module
//!
//! Keeps one Tesseract instance per language/model combination so repeated
//! scans skip engine initialization.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::ocr_config::{ModelType, OcrConfig};

/// Shared handle to a cached Tesseract instance
///
/// The async mutex lets a scan queue for the engine without tying up a
/// blocking thread; the owned guard then moves into the blocking worker.
pub type SharedTess = Arc<AsyncMutex<LepTess>>;

/// Thread-safe OCR instance manager for reusing Tesseract instances
///
/// Instances are created on first request for a key built from
/// [`OcrConfig::instance_key`] and reused afterwards. Each instance sits
/// behind its own mutex, so two scans on the same key run one after the
/// other while scans on different keys proceed in parallel.
///
/// An instance whose engine overran the time limit may still be held by its
/// blocking worker; [`OcrInstanceManager::discard_instance`] drops it from the
/// pool so the next scan starts from a fresh engine.
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<String, SharedTess>>,
}

impl OcrInstanceManager {
    /// Create an empty instance pool
    ///
    /// ```rust
    /// use ingredient_guard::instance_manager::OcrInstanceManager;
    ///
    /// let manager = OcrInstanceManager::new();
    /// assert_eq!(manager.instance_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create an OCR instance for the given configuration
    ///
    /// # Errors
    ///
    /// Returns error if Tesseract instance creation fails (e.g., missing
    /// traineddata for one of the configured languages)
    pub fn get_instance(&self, config: &OcrConfig) -> anyhow::Result<SharedTess> {
        let key = config.instance_key();

        if let Some(instance) = self.instances.lock().get(&key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            languages = %config.languages,
            model = %config.model_type.tessdata_dir(),
            "Creating new OCR instance"
        );

        let tessdata_path = Self::get_tessdata_path(config.model_type);

        let mut tess = LepTess::new(tessdata_path.as_deref(), &config.languages)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Tesseract OCR instance: {}", e))?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to set PSM mode: {}", e))?;

        // Ingredient names as user words improve recognition of diacritics
        if let Some(user_words_path) = &config.user_words_file {
            if std::path::Path::new(user_words_path).exists() {
                tess.set_variable(leptess::Variable::UserWordsFile, user_words_path)
                    .map_err(|e| anyhow::anyhow!("Failed to set user words file: {}", e))?;
                info!(path = %user_words_path, "Configured Tesseract user words file");
            } else {
                warn!(path = %user_words_path, "User words file not found, continuing without it");
            }
        }

        let instance = Arc::new(AsyncMutex::new(tess));

        // Another task may have raced us here; keep whichever landed first
        let mut instances = self.instances.lock();
        let stored = instances.entry(key).or_insert_with(|| Arc::clone(&instance));
        Ok(Arc::clone(stored))
    }

    /// Find the tessdata directory for the specified model type
    ///
    /// `TESSDATA_PREFIX` wins when set. Otherwise common installation paths are
    /// tried, falling back to Tesseract's built-in default.
    fn get_tessdata_path(model_type: ModelType) -> Option<String> {
        if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
            if !prefix.trim().is_empty() {
                return Some(prefix);
            }
        }

        let possible_paths = match model_type {
            ModelType::Fast => [
                "/usr/share/tesseract-ocr/5/tessdata_fast",
                "/usr/share/tesseract-ocr/4.00/tessdata_fast",
                "/usr/share/tessdata_fast",
                "/usr/local/share/tessdata_fast",
            ],
            ModelType::Best => [
                "/usr/share/tesseract-ocr/5/tessdata_best",
                "/usr/share/tesseract-ocr/4.00/tessdata_best",
                "/usr/share/tessdata_best",
                "/usr/local/share/tessdata_best",
            ],
        };

        for path in possible_paths {
            if std::path::Path::new(path).exists() {
                info!(path = %path, "Using tessdata path");
                return Some(path.to_string());
            }
        }

        info!(
            model_type = ?model_type,
            "No specific tessdata path found, using default"
        );
        None
    }

    /// Drop the cached instance for `config`, if any
    pub fn discard_instance(&self, config: &OcrConfig) -> bool {
        let key = config.instance_key();
        let removed = self.instances.lock().remove(&key).is_some();
        if removed {
            warn!(key = %key, "Discarded OCR instance");
        }
        removed
    }

    /// Number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}
