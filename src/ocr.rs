//! # OCR Processing Module
//!
//! Extracts text from photos of food packaging with the Tesseract engine.
//!
//! ## Supported Image Formats
//!
//! | Format | Default limit |
//! |--------|---------------|
//! | PNG    | 10MB          |
//! | JPEG   | 10MB          |
//! | BMP    | 5MB           |
//! | TIFF   | 10MB          |
//!
//! Every file must also fit the general 10MB limit. Formats are detected
//! from magic bytes, never from the file extension.
//!
//! ## Failure model
//!
//! A scan gets exactly one OCR attempt. Validation, initialization, load,
//! extraction and timeout failures are all returned to the caller as
//! [`OcrError`]; nothing here retries.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn, Instrument};

use crate::errors::error_logging;
pub use crate::instance_manager::OcrInstanceManager;
pub use crate::ocr_config::OcrConfig;
pub use crate::ocr_errors::OcrError;

/// Validate that `image_path` names a readable, non-empty file within the general size limit
///
/// Returns the file size in bytes.
pub fn validate_image_path(image_path: &str, config: &OcrConfig) -> Result<u64, OcrError> {
    if image_path.trim().is_empty() {
        return Err(OcrError::Validation("image path is empty".to_string()));
    }

    let path = Path::new(image_path);

    if !path.exists() {
        return Err(OcrError::Validation(format!(
            "file does not exist ({})",
            image_path
        )));
    }

    if !path.is_file() {
        return Err(OcrError::Validation(format!(
            "path is not a file ({})",
            image_path
        )));
    }

    let file_size = path
        .metadata()
        .map_err(|e| {
            OcrError::Validation(format!(
                "cannot read file metadata ({}) - {}",
                image_path, e
            ))
        })?
        .len();

    if file_size == 0 {
        return Err(OcrError::Validation(format!(
            "file is empty ({})",
            image_path
        )));
    }

    if file_size > config.max_file_size {
        return Err(OcrError::Validation(format!(
            "file too large ({} bytes, maximum allowed: {} bytes)",
            file_size, config.max_file_size
        )));
    }

    Ok(file_size)
}

/// Sniff the image format from the file header
pub fn detect_image_format(
    image_path: &str,
    config: &OcrConfig,
) -> Result<image::ImageFormat, OcrError> {
    let file = File::open(image_path).map_err(|e| {
        OcrError::Validation(format!(
            "cannot open image file ({}) - {}",
            image_path, e
        ))
    })?;

    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; config.buffer_size];
    let bytes_read = reader.read(&mut buffer).map_err(|e| {
        OcrError::Validation(format!(
            "cannot read image header ({}) - {}",
            image_path, e
        ))
    })?;

    if bytes_read < config.min_format_bytes {
        return Err(OcrError::Validation(format!(
            "not enough bytes to determine image format (read {}, need at least {})",
            bytes_read, config.min_format_bytes
        )));
    }
    buffer.truncate(bytes_read);

    let format = image::guess_format(&buffer)
        .map_err(|e| OcrError::Validation(format!("unknown image format - {}", e)))?;

    debug!(path = %image_path, format = ?format, "Detected image format");
    Ok(format)
}

/// Size limit for a supported format, `None` when Tesseract cannot read it
pub fn format_size_limit(format: image::ImageFormat, config: &OcrConfig) -> Option<u64> {
    match format {
        image::ImageFormat::Png => Some(config.format_limits.png_max),
        image::ImageFormat::Jpeg => Some(config.format_limits.jpeg_max),
        image::ImageFormat::Bmp => Some(config.format_limits.bmp_max),
        image::ImageFormat::Tiff => Some(config.format_limits.tiff_max),
        _ => None,
    }
}

/// Full pre-OCR validation: path checks, format detection and the format limit
pub fn validate_image_with_format_limits(
    image_path: &str,
    config: &OcrConfig,
) -> Result<(image::ImageFormat, u64), OcrError> {
    let file_size = validate_image_path(image_path, config)?;
    let format = detect_image_format(image_path, config)?;

    let limit = format_size_limit(format, config).ok_or_else(|| {
        OcrError::Validation(format!("unsupported image format {:?}", format))
    })?;

    if file_size > limit {
        return Err(OcrError::Validation(format!(
            "image file too large for {:?} format: {} bytes (maximum allowed: {} bytes)",
            format, file_size, limit
        )));
    }

    Ok((format, file_size))
}

/// Whether the file at `file_path` passes every pre-OCR check
pub fn is_supported_image_format(file_path: &str, config: &OcrConfig) -> bool {
    match validate_image_with_format_limits(file_path, config) {
        Ok(_) => true,
        Err(e) => {
            info!(path = %file_path, error = %e, "Image rejected before OCR");
            false
        }
    }
}

/// Trim every line and drop the blank ones
pub fn clean_extracted_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Extract text from an image file
///
/// Validates the file, then runs Tesseract on a blocking worker under
/// `config.operation_timeout_secs`. On timeout the cached Tesseract instance
/// is discarded, since the worker may still hold it.
///
/// ```rust,no_run
/// use ingredient_guard::ocr::{extract_text_from_image, OcrConfig, OcrInstanceManager};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OcrConfig::default();
/// let manager = OcrInstanceManager::new();
/// let text = extract_text_from_image("/tmp/label.jpg", &config, &manager).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub async fn extract_text_from_image(
    image_path: &str,
    config: &OcrConfig,
    instance_manager: &OcrInstanceManager,
) -> Result<String, OcrError> {
    let span = crate::observability::ocr_span("extract_text_from_image");
    async move {
        let start_time = Instant::now();

        let (format, image_size) = match validate_image_with_format_limits(image_path, config) {
            Ok(validated) => validated,
            Err(err) => {
                crate::observability::record_ocr_metrics(false, start_time.elapsed(), 0, Some(&err));
                return Err(err);
            }
        };

        info!(
            path = %image_path,
            format = ?format,
            image_size,
            "Starting OCR text extraction"
        );

        match perform_ocr_extraction(image_path, config, instance_manager).await {
            Ok(text) => {
                let duration = start_time.elapsed();
                crate::observability::record_ocr_metrics(true, duration, image_size, None);
                info!(
                    duration_ms = duration.as_millis() as u64,
                    characters = text.chars().count(),
                    "OCR extraction completed"
                );
                Ok(text)
            }
            Err(err) => {
                let duration = start_time.elapsed();
                crate::observability::record_ocr_metrics(false, duration, image_size, Some(&err));
                error_logging::log_ocr_error(
                    &err,
                    "extract_text_from_image",
                    None,
                    Some(image_size),
                    Some(duration),
                );
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

/// How a locked, time-limited engine run ended
#[derive(Debug, PartialEq, Eq)]
pub enum LockedRun<R> {
    /// The job returned within the limit
    Finished(R),
    /// The job was still running when the limit expired
    Overran,
}

/// Run `job` on the blocking pool with exclusive access to `instance`
///
/// The limit starts once the lock is held, so time spent queued behind
/// another scan on the same instance never counts against it. On overrun the
/// worker keeps the lock until the job returns.
pub async fn run_locked_with_timeout<T, R, F>(
    instance: Arc<AsyncMutex<T>>,
    limit: Duration,
    job: F,
) -> Result<LockedRun<R>, tokio::task::JoinError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut T) -> R + Send + 'static,
{
    let mut guard = instance.lock_owned().await;
    let worker = tokio::task::spawn_blocking(move || job(&mut *guard));

    match tokio::time::timeout(limit, worker).await {
        Ok(joined) => joined.map(LockedRun::Finished),
        Err(_) => Ok(LockedRun::Overran),
    }
}

async fn perform_ocr_extraction(
    image_path: &str,
    config: &OcrConfig,
    instance_manager: &OcrInstanceManager,
) -> Result<String, OcrError> {
    let instance = instance_manager
        .get_instance(config)
        .map_err(|e| OcrError::Initialization(e.to_string()))?;

    let limit = Duration::from_secs(config.operation_timeout_secs);
    let owned_path = image_path.to_string();

    let run = run_locked_with_timeout(instance, limit, move |tess| -> Result<String, OcrError> {
        tess.set_image(&owned_path)
            .map_err(|e| OcrError::ImageLoad(format!("Failed to load image for OCR: {e}")))?;
        tess.get_utf8_text()
            .map_err(|e| OcrError::Extraction(format!("Failed to extract text from image: {e}")))
    })
    .await;

    match run {
        Ok(LockedRun::Finished(Ok(raw))) => Ok(clean_extracted_text(&raw)),
        Ok(LockedRun::Finished(Err(e))) => Err(e),
        Ok(LockedRun::Overran) => {
            warn!(
                limit_secs = config.operation_timeout_secs,
                "OCR engine overran its time limit"
            );
            instance_manager.discard_instance(config);
            Err(OcrError::Timeout(format!(
                "OCR operation timed out after {} seconds",
                config.operation_timeout_secs
            )))
        }
        Err(join_error) => Err(OcrError::Extraction(format!(
            "OCR worker terminated unexpectedly: {join_error}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_extracted_text() {
        let raw = "  Ingrediente: făină  \n\n   \n zahăr, lapte \n";
        assert_eq!(clean_extracted_text(raw), "Ingrediente: făină\nzahăr, lapte");
        assert_eq!(clean_extracted_text(""), "");
    }

    #[test]
    fn test_format_size_limit() {
        let config = OcrConfig::default();
        assert_eq!(
            format_size_limit(image::ImageFormat::Png, &config),
            Some(config.format_limits.png_max)
        );
        assert_eq!(format_size_limit(image::ImageFormat::Gif, &config), None);
    }

    #[test]
    fn test_validate_missing_path() {
        let config = OcrConfig::default();
        let err = validate_image_path("/definitely/not/here.png", &config).unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));

        let err = validate_image_path("", &config).unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));
    }

    #[tokio::test]
    async fn test_queue_wait_does_not_count_toward_limit() {
        let instance = Arc::new(AsyncMutex::new(0u32));
        let held = Arc::clone(&instance).lock_owned().await;
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(held);
        });

        let started = Instant::now();
        let run = run_locked_with_timeout(Arc::clone(&instance), Duration::from_millis(100), |count| {
            *count += 1;
            *count
        })
        .await
        .unwrap();

        assert_eq!(run, LockedRun::Finished(1));
        assert!(started.elapsed() >= Duration::from_millis(300));
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_engine_overruns_and_keeps_lock() {
        let instance = Arc::new(AsyncMutex::new(()));

        let run = run_locked_with_timeout(Arc::clone(&instance), Duration::from_millis(50), |_| {
            std::thread::sleep(Duration::from_millis(400));
        })
        .await
        .unwrap();

        assert_eq!(run, LockedRun::Overran);
        assert!(instance.try_lock().is_err());
    }

    #[tokio::test]
    async fn test_job_errors_finish_normally() {
        let instance = Arc::new(AsyncMutex::new(()));

        let run = run_locked_with_timeout(instance, Duration::from_secs(5), |_| {
            Err::<String, _>(OcrError::Extraction("empty page".to_string()))
        })
        .await
        .unwrap();

        assert!(matches!(run, LockedRun::Finished(Err(OcrError::Extraction(_)))));
    }
}
