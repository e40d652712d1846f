//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! - [`tracing_mod`]: structured logging, OTLP export and span helpers
//! - [`metrics`]: Prometheus recorder, the metrics/health server and recording helpers
//! - [`health_checks`]: readiness checks for the database and Tesseract

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::observability_config::ObservabilityConfig;

pub use self::metrics::{
    record_db_metrics, record_error_metrics, record_history_save_failure, record_ocr_metrics,
    record_personal_alert, record_scan_metrics, record_startup_metrics,
    record_telegram_performance_metrics,
};
pub use self::tracing_mod::{db_span, ocr_span, scan_span, telegram_span};

/// Initialize logging and optional trace export
///
/// Runs before anything else logs, so configuration errors after this point
/// are reported through tracing.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    tracing_mod::init_tracing_with_config(config)?;
    tracing_mod::init_opentelemetry_tracing_with_config(config)?;
    Ok(())
}

/// Install the Prometheus recorder and start the metrics/health server
pub async fn init_metrics_server(
    metrics_port: u16,
    db_pool: Option<Arc<PgPool>>,
    ocr_languages: String,
) -> Result<()> {
    let metrics_handle = metrics::init_metrics()?;
    let has_db_pool = db_pool.is_some();
    metrics::start_metrics_server(metrics_handle, metrics_port, db_pool, ocr_languages).await?;

    tracing::info!(
        metrics_port = %metrics_port,
        has_db_pool = %has_db_pool,
        "Metrics server with health checks initialized"
    );
    Ok(())
}
