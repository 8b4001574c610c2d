//! # Catalog Core
//!
//! 카탈로그 API의 핵심 도메인 모델과 저장소 계약을 제공합니다.
//!
//! 이 크레이트는 HTTP 계층과 무관한 기본 타입을 담고 있습니다:
//! - 사용자, 요청 신원(Identity), 권한 집합
//! - 베어러 토큰 생성 및 다이제스트 (TokenCodec)
//! - 카탈로그 레코드와 목록 필터/메타데이터
//! - 저장소 trait (사용자/토큰/권한/레코드)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod store;
pub mod validation;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use store::*;
pub use validation::*;
