//! Prometheus metrics for the AniLog server.
//!
//! Names follow the Prometheus conventions and are kept in one enum so call
//! sites never spell metric strings by hand.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // HTTP metrics
    HttpRequests,
    HttpRequestDuration,

    // Auth metrics
    LoginSuccess,
    LoginFailure,
    TokenRefreshSuccess,
    TokenRefreshFailure,
    Registrations,

    // Catalog metrics
    CatalogRequestsSuccess,
    CatalogRequestsError,
    CatalogRequestDuration,
    CatalogResults,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpRequests => "anilog_http_requests_total",
            MetricName::HttpRequestDuration => "anilog_http_request_duration_seconds",
            MetricName::LoginSuccess => "anilog_auth_login_success_total",
            MetricName::LoginFailure => "anilog_auth_login_failure_total",
            MetricName::TokenRefreshSuccess => "anilog_auth_refresh_success_total",
            MetricName::TokenRefreshFailure => "anilog_auth_refresh_failure_total",
            MetricName::Registrations => "anilog_auth_registrations_total",
            MetricName::CatalogRequestsSuccess => "anilog_catalog_requests_success_total",
            MetricName::CatalogRequestsError => "anilog_catalog_requests_error_total",
            MetricName::CatalogRequestDuration => "anilog_catalog_request_duration_seconds",
            MetricName::CatalogResults => "anilog_catalog_results",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        warn!("Metrics recorder was initialized concurrently");
    }
    info!("Metrics system initialized");
    Ok(())
}

/// Renders the current metrics in Prometheus text format.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub mod http {
    use super::MetricName;

    pub fn request_completed(method: &str, route: &str, status: u16, secs: f64) {
        ::metrics::counter!(
            MetricName::HttpRequests.as_str(),
            "method" => method.to_string(),
            "route" => route.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        ::metrics::histogram!(
            MetricName::HttpRequestDuration.as_str(),
            "method" => method.to_string(),
            "route" => route.to_string()
        )
        .record(secs);
    }
}

pub mod auth {
    use super::MetricName;

    pub fn login_success() {
        ::metrics::counter!(MetricName::LoginSuccess.as_str()).increment(1);
    }

    pub fn login_failure() {
        ::metrics::counter!(MetricName::LoginFailure.as_str()).increment(1);
    }

    pub fn refresh_success() {
        ::metrics::counter!(MetricName::TokenRefreshSuccess.as_str()).increment(1);
    }

    pub fn refresh_failure() {
        ::metrics::counter!(MetricName::TokenRefreshFailure.as_str()).increment(1);
    }

    pub fn registered() {
        ::metrics::counter!(MetricName::Registrations.as_str()).increment(1);
    }
}

pub mod catalog {
    use super::MetricName;

    pub fn request_success(operation: &'static str, secs: f64, results: usize) {
        ::metrics::counter!(MetricName::CatalogRequestsSuccess.as_str(), "operation" => operation)
            .increment(1);
        ::metrics::histogram!(MetricName::CatalogRequestDuration.as_str(), "operation" => operation)
            .record(secs);
        ::metrics::histogram!(MetricName::CatalogResults.as_str(), "operation" => operation)
            .record(results as f64);
    }

    pub fn request_error(operation: &'static str) {
        ::metrics::counter!(MetricName::CatalogRequestsError.as_str(), "operation" => operation)
            .increment(1);
    }
}
