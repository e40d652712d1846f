//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Rate limiting and bearer authentication for the metrics endpoint
//! - The Prometheus metrics/health HTTP server
//! - Metrics recording functions for OCR, scans, persistence and Telegram traffic

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use crate::analysis::AnalysisOutcome;
use crate::ocr_errors::OcrError;

/// Simple rate limiter for HTTP requests
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_secs,
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.window_secs);

        let mut requests = self.requests.lock();

        // Clients with nothing left in the window are forgotten
        requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < window);
            !times.is_empty()
        });

        let client_requests = requests.entry(ip.to_string()).or_default();
        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        client_requests.push(now);
        true
    }

    /// Number of clients with requests inside the current window
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().len()
    }
}

/// Compare an `Authorization` header value against the expected bearer token
///
/// With no expected token every request is accepted.
pub fn is_authorized(auth_header: Option<&str>, expected_token: Option<&str>) -> bool {
    let expected = match expected_token {
        Some(token) if !token.is_empty() => token,
        _ => return true,
    };

    auth_header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

/// Check the `METRICS_AUTH_TOKEN` bearer token on a request
pub fn check_auth<B>(req: &hyper::Request<B>) -> bool {
    let expected = std::env::var("METRICS_AUTH_TOKEN").ok();
    let header = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    is_authorized(header, expected.as_deref())
}

/// Check request size limit
pub fn check_request_size<B>(req: &hyper::Request<B>) -> bool {
    const MAX_REQUEST_SIZE: u64 = 1024 * 1024; // 1MB limit

    match req.headers().get("content-length") {
        Some(content_length) => content_length
            .to_str()
            .ok()
            .and_then(|size| size.parse::<u64>().ok())
            .map(|size| size <= MAX_REQUEST_SIZE)
            .unwrap_or(false),
        None => true,
    }
}

/// Install the Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

fn text_response(status: hyper::StatusCode, body: impl Into<String>) -> hyper::Response<String> {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() = status;
    response
}

/// Start the metrics server with liveness and readiness endpoints
///
/// Binds to localhost unless `METRICS_BIND_ALL_INTERFACES=true`.
pub async fn start_metrics_server(
    metrics_handle: PrometheusHandle,
    port: u16,
    db_pool: Option<Arc<PgPool>>,
    ocr_languages: String,
) -> Result<()> {
    let bind_all = std::env::var("METRICS_BIND_ALL_INTERFACES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let addr = if bind_all {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    };

    // 10 requests per minute per IP
    let rate_limiter = Arc::new(RateLimiter::new(10, 60));
    let started_at = Instant::now();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, bind_all, "Metrics server listening");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();
                    let db_pool = db_pool.clone();
                    let ocr_languages = ocr_languages.clone();
                    let rate_limiter = rate_limiter.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let db_pool = db_pool.clone();
                                let ocr_languages = ocr_languages.clone();
                                let peer_ip = peer_addr.ip().to_string();
                                let rate_limiter = rate_limiter.clone();
                                async move {
                                    if !rate_limiter.is_allowed(&peer_ip) {
                                        return Ok::<_, std::convert::Infallible>(text_response(
                                            hyper::StatusCode::TOO_MANY_REQUESTS,
                                            "Rate limit exceeded",
                                        ));
                                    }

                                    if !check_request_size(&req) {
                                        return Ok(text_response(
                                            hyper::StatusCode::PAYLOAD_TOO_LARGE,
                                            "Request too large",
                                        ));
                                    }

                                    if !check_auth(&req) {
                                        let mut response = text_response(
                                            hyper::StatusCode::UNAUTHORIZED,
                                            "Unauthorized",
                                        );
                                        response.headers_mut().insert(
                                            "www-authenticate",
                                            hyper::header::HeaderValue::from_static("Bearer"),
                                        );
                                        return Ok(response);
                                    }

                                    match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/metrics") => {
                                            record_uptime(started_at.elapsed().as_secs_f64());
                                            let mut response =
                                                hyper::Response::new(metrics_handle.render());
                                            response.headers_mut().insert(
                                                "content-type",
                                                hyper::header::HeaderValue::from_static(
                                                    "text/plain; version=0.0.4; charset=utf-8",
                                                ),
                                            );
                                            Ok(response)
                                        }
                                        (&hyper::Method::GET, "/health/live") => {
                                            Ok(hyper::Response::new("OK".to_string()))
                                        }
                                        (&hyper::Method::GET, "/health/ready") => {
                                            match super::health_checks::perform_readiness_checks(
                                                db_pool,
                                                &ocr_languages,
                                            )
                                            .await
                                            {
                                                Ok(()) => Ok(hyper::Response::new("OK".to_string())),
                                                Err(e) => Ok(text_response(
                                                    hyper::StatusCode::SERVICE_UNAVAILABLE,
                                                    format!("NOT READY: {}", e),
                                                )),
                                            }
                                        }
                                        _ => Ok(text_response(
                                            hyper::StatusCode::NOT_FOUND,
                                            "Not Found",
                                        )),
                                    }
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            crate::errors::error_logging::log_network_error(
                                &err,
                                "serve_http_connection",
                                Some(&peer_addr.to_string()),
                                None,
                            );
                        }
                    });
                }
                Err(e) => {
                    crate::errors::error_logging::log_network_error(
                        &e,
                        "accept_tcp_connection",
                        Some(&addr.to_string()),
                        None,
                    );
                }
            }
        }
    });

    Ok(())
}

/// Record OCR operation metrics
pub fn record_ocr_metrics(
    success: bool,
    duration: Duration,
    image_size: u64,
    failure: Option<&OcrError>,
) {
    metrics::counter!("ocr_operations_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
    if image_size > 0 {
        metrics::histogram!("ocr_image_size_bytes").record(image_size as f64);
    }
    if let Some(error) = failure {
        metrics::counter!("ocr_failures_total", "kind" => error.kind()).increment(1);
    }
}

/// Record the result of one analysed scan
pub fn record_scan_metrics(source: &'static str, outcome: &AnalysisOutcome, duration: Duration) {
    metrics::counter!("scans_total", "source" => source).increment(1);
    metrics::histogram!("scan_duration_seconds", "source" => source)
        .record(duration.as_secs_f64());
    metrics::histogram!("scan_ingredients_found").record(outcome.ingredients.len() as f64);

    for allergen in &outcome.allergens {
        metrics::counter!("allergen_detections_total", "severity" => allergen.severity.as_str())
            .increment(1);
    }
    if outcome.personal_match_detected {
        metrics::counter!("personal_allergen_matches_total").increment(1);
    }
}

/// Record a personal allergen alert delivered to a user
pub fn record_personal_alert() {
    metrics::counter!("personal_alerts_sent_total").increment(1);
}

/// Record a dropped background history write
pub fn record_history_save_failure() {
    metrics::counter!("history_save_failures_total").increment(1);
}

/// Record database operation metrics
pub fn record_db_metrics(operation: &str, duration: Duration) {
    let operation = operation.to_string();
    metrics::counter!("db_operations_total", "operation" => operation.clone()).increment(1);
    metrics::histogram!("db_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    metrics::counter!("health_checks_total", "type" => check_type.clone(), "result" => if success { "success" } else { "failure" }.to_string()).increment(1);
    metrics::histogram!("health_check_duration_seconds", "type" => check_type.clone())
        .record(duration.as_secs_f64());
    metrics::gauge!("health_check_status", "type" => check_type).set(if success {
        1.0
    } else {
        0.0
    });
}

/// Record error rate metrics
pub fn record_error_metrics(error_type: &str, component: &str) {
    let error_type = error_type.to_string();
    let component = component.to_string();
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}

/// Record application startup metrics
pub fn record_startup_metrics(duration: Duration) {
    metrics::histogram!("application_startup_duration_seconds").record(duration.as_secs_f64());
    metrics::counter!("application_starts_total").increment(1);
}

/// Record application uptime
pub fn record_uptime(uptime_secs: f64) {
    metrics::gauge!("application_uptime_seconds").set(uptime_secs);
}

/// Record Telegram message processing metrics
pub fn record_telegram_message(message_type: &str) {
    let message_type = message_type.to_string();
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}

/// Record how long a Telegram update took to handle
pub fn record_telegram_performance_metrics(
    message_type: &str,
    processing_duration: Duration,
    has_media: bool,
) {
    record_telegram_message(message_type);

    let message_type = message_type.to_string();
    metrics::histogram!("telegram_processing_duration_seconds", "type" => message_type)
        .record(processing_duration.as_secs_f64());
    metrics::counter!("telegram_media_messages_total", "has_media" => has_media.to_string())
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_blocks_after_limit() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_rate_limiter_forgets_idle_clients() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);

        std::thread::sleep(Duration::from_millis(1100));

        assert!(limiter.is_allowed("10.0.0.3"));
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.is_allowed("10.0.0.1"));
    }

    #[test]
    fn test_is_authorized() {
        assert!(is_authorized(None, None));
        assert!(is_authorized(None, Some("")));
        assert!(is_authorized(Some("Bearer s3cret"), Some("s3cret")));
        assert!(!is_authorized(Some("Bearer wrong"), Some("s3cret")));
        assert!(!is_authorized(Some("s3cret"), Some("s3cret")));
        assert!(!is_authorized(None, Some("s3cret")));
    }

    #[test]
    fn test_check_request_size() {
        let small = hyper::Request::builder()
            .header("content-length", "10")
            .body(())
            .unwrap();
        assert!(check_request_size(&small));

        let large = hyper::Request::builder()
            .header("content-length", "99999999")
            .body(())
            .unwrap();
        assert!(!check_request_size(&large));

        let none = hyper::Request::builder().body(()).unwrap();
        assert!(check_request_size(&none));
    }
}
