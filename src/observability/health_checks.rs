//! Health check functionality module.
//!
//! Readiness means the database answers and Tesseract can load the configured
//! languages.

use anyhow::Result;
use leptess::LepTess;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// Run all readiness checks
pub async fn perform_readiness_checks(
    db_pool: Option<Arc<PgPool>>,
    ocr_languages: &str,
) -> Result<()> {
    if let Some(pool) = &db_pool {
        let start = Instant::now();
        let result = check_database_health(pool.as_ref()).await;
        super::metrics::record_health_check_metrics("database", result.is_ok(), start.elapsed());
        result?;
    }

    let start = Instant::now();
    let result = check_ocr_health(ocr_languages).await;
    super::metrics::record_health_check_metrics("ocr", result.is_ok(), start.elapsed());
    result
}

/// Check database connectivity and basic query capability
pub async fn check_database_health(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;

    tracing::debug!("Database health check passed");
    Ok(())
}

/// Check that Tesseract initializes with the configured languages
pub async fn check_ocr_health(languages: &str) -> Result<()> {
    let languages = languages.to_string();
    let outcome = tokio::task::spawn_blocking(move || LepTess::new(None, &languages).map(|_| ()))
        .await
        .map_err(|e| anyhow::anyhow!("OCR health check worker failed: {}", e))?;

    match outcome {
        Ok(()) => {
            tracing::debug!("OCR health check passed");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("OCR health check failed: {}", e)),
    }
}
