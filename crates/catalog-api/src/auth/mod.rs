//! 인증 및 인가.
//!
//! - [`password`]: Argon2id 비밀번호 해싱
//! - [`tokens`]: 베어러 토큰 발급/조회/폐기
//! - [`identity`]: `Authorization` 헤더 → 요청 신원
//! - [`gate`]: 인증 → 활성화 → 권한 순서의 접근 게이트

pub mod gate;
pub mod identity;
pub mod password;
pub mod tokens;

pub use gate::{Access, Authorized, Gate, ReadRecords, Requirement, SignedIn, WriteRecords};
pub use identity::{authenticate, resolve_identity, CurrentIdentity};
pub use password::{hash_password, verify_password, PasswordError};
pub use tokens::{IssueError, TokenService};
