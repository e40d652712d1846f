//! # OCR Error Types Module
//!
//! Failure modes of the OCR stage. Every variant is terminal for the scan that
//! produced it; callers surface the error instead of retrying.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// File validation errors
    Validation(String),
    /// OCR engine initialization errors
    Initialization(String),
    /// Image loading errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Timeout errors
    Timeout(String),
}

impl OcrError {
    /// Metric label for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::Validation(_) => "validation",
            OcrError::Initialization(_) => "initialization",
            OcrError::ImageLoad(_) => "image_load",
            OcrError::Extraction(_) => "extraction",
            OcrError::Timeout(_) => "timeout",
        }
    }

    /// Localization key of the message shown to the user
    pub fn user_message_key(&self) -> &'static str {
        match self {
            OcrError::Validation(_) => "error-image-invalid",
            OcrError::Initialization(_) => "error-ocr-unavailable",
            OcrError::ImageLoad(_) => "error-image-load",
            OcrError::Extraction(_) => "error-ocr-extraction",
            OcrError::Timeout(_) => "error-ocr-timeout",
        }
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "[VALIDATION] Image validation failed: {}", msg),
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg),
            OcrError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg),
            OcrError::Extraction(msg) => write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg),
            OcrError::Timeout(msg) => write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}
