//! API 서버용 HTTP middleware.
//!
//! 요청 처리 순서: 요청 수 제한 → 신원 확인 → 핸들러.
//! 메트릭과 내부 에러 로깅은 그 바깥에서 모든 응답을 관찰합니다.

mod error_log;
mod metrics;
mod rate_limit;

pub use error_log::log_internal_errors;
pub use metrics::metrics_layer;
pub use rate_limit::{
    extract_client_ip, rate_limit_middleware, RateLimitConfig, RateLimitResult, RateLimiter,
    IDLE_TIMEOUT, SWEEP_INTERVAL,
};
