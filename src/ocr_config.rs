//! # OCR Configuration Module
//!
//! Configuration structures for OCR processing: languages, Tesseract model and
//! page segmentation, the operation timeout, and format-specific size limits.

use crate::errors::{AppError, AppResult};
use std::str::FromStr;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "ron+eng";
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for image files
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Format-specific file size limits for different image formats
///
/// These sit under the general `max_file_size`, which is checked first.
#[derive(Debug, Clone)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
    /// BMP format limit (lower due to uncompressed nature)
    pub bmp_max: u64,
    /// TIFF format limit (can be large, multi-page support)
    pub tiff_max: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 10 * 1024 * 1024,  // 10MB for PNG
            jpeg_max: 10 * 1024 * 1024, // 10MB for JPEG
            bmp_max: 5 * 1024 * 1024,   // 5MB for BMP
            tiff_max: 10 * 1024 * 1024, // 10MB for TIFF
        }
    }
}

impl FormatSizeLimits {
    /// Validate format size limits
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("png_max", self.png_max),
            ("jpeg_max", self.jpeg_max),
            ("bmp_max", self.bmp_max),
            ("tiff_max", self.tiff_max),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.bmp_max > self.png_max {
            return Err(AppError::Config(format!(
                "bmp_max ({}) should not exceed png_max ({})",
                self.bmp_max, self.png_max
            )));
        }
        if self.jpeg_max > self.png_max {
            return Err(AppError::Config(format!(
                "jpeg_max ({}) should not exceed png_max ({})",
                self.jpeg_max, self.png_max
            )));
        }

        Ok(())
    }
}

/// Page Segmentation Mode for Tesseract OCR
///
/// Only the modes that make sense for ingredient panels are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto,
    /// Assume a single column of text
    SingleColumn,
    /// Assume a single uniform block of text
    SingleBlock,
    /// Find as much text as possible in no particular order
    SparseText,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SparseText => "11",
        }
    }
}

impl FromStr for PageSegMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3" | "auto" => Ok(PageSegMode::Auto),
            "4" | "single_column" => Ok(PageSegMode::SingleColumn),
            "6" | "single_block" => Ok(PageSegMode::SingleBlock),
            "11" | "sparse" | "sparse_text" => Ok(PageSegMode::SparseText),
            other => Err(AppError::Config(format!(
                "Unsupported page segmentation mode '{}'",
                other
            ))),
        }
    }
}

/// Tesseract model type for different accuracy/speed trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelType {
    /// Fast model (tessdata_fast) - faster processing, lower accuracy
    #[default]
    Fast,
    /// Best model (tessdata_best) - slower processing, higher accuracy
    Best,
}

impl ModelType {
    /// Get the tessdata directory name for this model type
    pub fn tessdata_dir(&self) -> &'static str {
        match self {
            ModelType::Fast => "tessdata_fast",
            ModelType::Best => "tessdata_best",
        }
    }
}

impl FromStr for ModelType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(ModelType::Fast),
            "best" => Ok(ModelType::Best),
            other => Err(AppError::Config(format!(
                "OCR_MODEL_TYPE must be 'fast' or 'best', got '{}'",
                other
            ))),
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR language codes (e.g., "ron", "ron+eng")
    pub languages: String,
    /// Tesseract model type (Fast vs Best accuracy)
    pub model_type: ModelType,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed file size in bytes (general limit)
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Upper bound for a single OCR run, in seconds
    pub operation_timeout_secs: u64,
    /// Default page segmentation mode for OCR
    pub psm_mode: PageSegMode,
    /// Path to custom user words file for improved recognition
    pub user_words_file: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            model_type: ModelType::default(),
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            psm_mode: PageSegMode::default(),
            user_words_file: Some("config/user_words.txt".to_string()),
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }
        if self
            .languages
            .split('+')
            .any(|code| code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(AppError::Config(format!(
                "languages '{}' must be '+'-separated Tesseract codes",
                self.languages
            )));
        }

        if self.buffer_size == 0 {
            return Err(AppError::Config(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes == 0 {
            return Err(AppError::Config(
                "min_format_bytes must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes > self.buffer_size {
            return Err(AppError::Config(format!(
                "min_format_bytes ({}) cannot exceed buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }

        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.operation_timeout_secs > 300 {
            return Err(AppError::Config(
                "operation_timeout_secs cannot be greater than 300 seconds".to_string(),
            ));
        }

        self.format_limits.validate()?;

        Ok(())
    }

    /// Instance cache key for the configured languages and model
    pub fn instance_key(&self) -> String {
        format!("{}:{}", self.languages, self.model_type.tessdata_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OcrConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.languages, "ron+eng");
        assert_eq!(config.operation_timeout_secs, 30);
    }

    #[test]
    fn test_default_format_limits_fit_general_limit() {
        let limits = FormatSizeLimits::default();
        for limit in [limits.png_max, limits.jpeg_max, limits.bmp_max, limits.tiff_max] {
            assert!(limit <= MAX_FILE_SIZE);
        }
        assert_eq!(OcrConfig::default().max_file_size, MAX_FILE_SIZE);
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_format_size_limits_validation() {
        let mut config = FormatSizeLimits::default();
        assert!(config.validate().is_ok());

        config.png_max = 0;
        assert!(config.validate().is_err());
        config.png_max = 10 * 1024 * 1024;

        // bmp_max > png_max
        config.bmp_max = 20 * 1024 * 1024;
        assert!(config.validate().is_err());
        config.bmp_max = 5 * 1024 * 1024;

        // jpeg_max > png_max
        config.jpeg_max = 20 * 1024 * 1024;
        assert!(config.validate().is_err());
        config.jpeg_max = 10 * 1024 * 1024;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ocr_configs() {
        let config = OcrConfig {
            languages: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OcrConfig {
            languages: "ron++eng".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OcrConfig {
            operation_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OcrConfig {
            min_format_bytes: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_type_parsing() {
        assert_eq!("best".parse::<ModelType>().unwrap(), ModelType::Best);
        assert_eq!(" FAST ".parse::<ModelType>().unwrap(), ModelType::Fast);
        assert!("medium".parse::<ModelType>().is_err());
        assert_eq!(ModelType::Best.tessdata_dir(), "tessdata_best");
    }

    #[test]
    fn test_psm_parsing() {
        assert_eq!("6".parse::<PageSegMode>().unwrap(), PageSegMode::SingleBlock);
        assert_eq!("sparse".parse::<PageSegMode>().unwrap().as_str(), "11");
        assert!("13".parse::<PageSegMode>().is_err());
    }

    #[test]
    fn test_instance_key() {
        let config = OcrConfig::default();
        assert_eq!(config.instance_key(), "ron+eng:tessdata_fast");
    }
}
