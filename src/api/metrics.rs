//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! Besides per-request counters this records board activity: jobs posted,
//! applications submitted and notification deliveries by channel.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const JOBS_POSTED_TOTAL: &str = "jobs_posted_total";
pub const APPLICATIONS_SUBMITTED_TOTAL: &str = "applications_submitted_total";
pub const NOTIFICATIONS_DISPATCHED_TOTAL: &str = "notifications_dispatched_total";

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(JOBS_POSTED_TOTAL, "Total number of jobs posted");
    describe_counter!(
        APPLICATIONS_SUBMITTED_TOTAL,
        "Total number of job applications submitted"
    );
    describe_counter!(
        NOTIFICATIONS_DISPATCHED_TOTAL,
        "Notification deliveries by channel (queue/log/private/topic) and outcome"
    );

    Ok(handle)
}

/// GET /metrics - Prometheus text format, no authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Records `http_requests_total` and `http_request_duration_seconds`,
/// labelled by the matched route template rather than the raw path.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

pub fn record_job_posted() {
    counter!(JOBS_POSTED_TOTAL).increment(1);
}

pub fn record_application_submitted() {
    counter!(APPLICATIONS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_notification(channel: &'static str, outcome: &'static str) {
    counter!(NOTIFICATIONS_DISPATCHED_TOTAL, "channel" => channel, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(HTTP_REQUESTS_TOTAL.ends_with("_total"));
        assert!(JOBS_POSTED_TOTAL.ends_with("_total"));
        assert!(APPLICATIONS_SUBMITTED_TOTAL.ends_with("_total"));
        assert!(NOTIFICATIONS_DISPATCHED_TOTAL.ends_with("_total"));
        assert!(HTTP_REQUEST_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_job_posted();
        record_notification("topic", "no_subscribers");
    }
}
