//! 카탈로그 JSON API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (`/api/v1`)
//! - 해시 저장 베어러 토큰 인증과 권한 게이트
//! - 클라이언트별 요청 수 제한
//! - 기대 버전 기반 낙관적 동시성 제어
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰, 신원 확인, 접근 게이트
//! - [`concurrency`]: 조건부 갱신
//! - [`repository`]: PostgreSQL / 인메모리 저장소
//! - [`middleware`]: HTTP 미들웨어
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`server`]: 서빙과 graceful shutdown

pub mod auth;
pub mod concurrency;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{hash_password, verify_password, Authorized, Gate, TokenService};
pub use concurrency::{guarded_update, ExpectedVersion, EXPECTED_VERSION_HEADER};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::{RateLimitConfig, RateLimiter};
pub use repository::{MemoryStore, PgStore, Repositories};
pub use routes::create_api_router;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
