//! 접근 게이트.
//!
//! 인가 순서를 데이터로 표현합니다. [`Gate`]는 [`Requirement`] 목록을
//! 앞에서부터 평가하며 처음 실패한 단계에서 멈춥니다.
//!
//! | 게이트 | 단계 |
//! |--------|------|
//! | `Gate::authenticated()` | 인증 |
//! | `Gate::activated()` | 인증 → 활성화 |
//! | `Gate::permission(code)` | 인증 → 활성화 → 권한 |
//!
//! 핸들러는 [`Authorized<A>`] 추출기로 게이트를 적용합니다. 추출기는 본문
//! 추출보다 먼저 실행되므로 거부된 요청은 비즈니스 로직과 쓰기에 도달하지 않습니다.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use catalog_core::{Identity, PermissionStore, User, RECORDS_READ, RECORDS_WRITE};

use crate::auth::CurrentIdentity;
use crate::error::ApiError;
use crate::state::AppState;

/// 게이트 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// 익명이 아니어야 함
    Authenticated,
    /// 활성화된 계정이어야 함
    Activated,
    /// 권한 코드를 보유해야 함 (요청마다 저장소에서 조회)
    Permission(&'static str),
}

/// 순서가 있는 인가 단계 목록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    stages: Vec<Requirement>,
}

impl Gate {
    pub fn authenticated() -> Self {
        Self {
            stages: vec![Requirement::Authenticated],
        }
    }

    pub fn activated() -> Self {
        Self {
            stages: vec![Requirement::Authenticated, Requirement::Activated],
        }
    }

    pub fn permission(code: &'static str) -> Self {
        Self {
            stages: vec![
                Requirement::Authenticated,
                Requirement::Activated,
                Requirement::Permission(code),
            ],
        }
    }

    pub fn stages(&self) -> &[Requirement] {
        &self.stages
    }

    /// 신원에 게이트를 적용합니다. 통과하면 인증된 사용자를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired`: 익명 신원
    /// - `InactiveAccount`: 활성화되지 않은 계정
    /// - `NotPermitted`: 권한 코드 없음
    pub async fn evaluate<'a>(
        &self,
        identity: &'a Identity,
        permissions: &dyn PermissionStore,
    ) -> Result<&'a User, ApiError> {
        let user = match identity {
            Identity::Anonymous => return Err(ApiError::AuthenticationRequired),
            Identity::Authenticated(user) => user,
        };

        for stage in &self.stages {
            match *stage {
                Requirement::Authenticated => {}
                Requirement::Activated => {
                    if !user.activated {
                        return Err(ApiError::InactiveAccount);
                    }
                }
                Requirement::Permission(code) => {
                    let granted = permissions.get_all_for_user(user.id).await?;
                    if !granted.includes(code) {
                        tracing::debug!(user_id = user.id, permission = code, "permission denied");
                        return Err(ApiError::NotPermitted);
                    }
                }
            }
        }

        Ok(user)
    }
}

/// 핸들러에 적용할 게이트 종류.
pub trait Access: Send + Sync + 'static {
    fn gate() -> Gate;
}

/// 인증된 사용자.
#[derive(Debug)]
pub struct SignedIn;

impl Access for SignedIn {
    fn gate() -> Gate {
        Gate::authenticated()
    }
}

/// `records:read` 권한.
#[derive(Debug)]
pub struct ReadRecords;

impl Access for ReadRecords {
    fn gate() -> Gate {
        Gate::permission(RECORDS_READ)
    }
}

/// `records:write` 권한.
#[derive(Debug)]
pub struct WriteRecords;

impl Access for WriteRecords {
    fn gate() -> Gate {
        Gate::permission(RECORDS_WRITE)
    }
}

/// 게이트를 통과한 사용자 추출기.
#[derive(Debug)]
pub struct Authorized<A: Access> {
    pub user: User,
    _access: PhantomData<fn() -> A>,
}

impl<A: Access> FromRequestParts<Arc<AppState>> for Authorized<A> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        let gate = A::gate();
        let user = gate
            .evaluate(&identity, state.repos.permissions.as_ref())
            .await?
            .clone();

        Ok(Self {
            user,
            _access: PhantomData,
        })
    }
}
