//! Prometheus 메트릭.
//!
//! HTTP 요청, 요청 수 제한, 토큰 발급 메트릭을 기록하고 `/metrics`로 노출합니다.

use catalog_core::TokenScope;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 레코더를 전역으로 설치하고 렌더링 핸들을 반환합니다.
///
/// # Errors
///
/// 레코더가 이미 설치되어 있으면 `BuildError`.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP
// ============================================================================

pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 요청 수 제한 / 토큰
// ============================================================================

/// 요청 수 제한 판정 카운터 (`allowed` | `limited`).
pub fn record_rate_limit_decision(status: &'static str) {
    counter!("rate_limit_requests_total", "status" => status).increment(1);
}

/// 추적 중인 클라이언트 수.
pub fn set_rate_limit_tracked_clients(count: usize) {
    gauge!("rate_limit_tracked_clients").set(count as f64);
}

pub fn record_token_issued(scope: TokenScope) {
    counter!("tokens_issued_total", "scope" => scope.as_str()).increment(1);
}
