//! 저장소 추상화.
//!
//! 사용자/토큰/권한/레코드 테이블에 대한 연산을 trait로 정의합니다.
//! PostgreSQL 구현과 인메모리 구현이 같은 계약을 따릅니다.
//!
//! 버전 펜스가 있는 갱신(`update_user`, `update_record`)은 저장소 수준에서
//! 원자적이어야 합니다: "id와 관찰한 version이 모두 일치하는 행만 갱신하고
//! version을 1 증가". 일치하는 행이 없으면 `StoreError::EditConflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Filters, Metadata, NewUser, Permissions, Record, Token, TokenScope, User};
use crate::error::StoreResult;

/// 사용자 테이블.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 새 사용자를 저장합니다.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateEmail`: 같은 이메일(대소문자 무시)이 이미 있음
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// 이메일로 사용자를 조회합니다.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<User>;

    /// 버전 펜스 갱신. 성공하면 새 version이 반영된 사용자를 반환합니다.
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    /// 사용자와 그 토큰, 권한을 함께 삭제합니다. 없으면 `StoreError::RecordNotFound`.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;
}

/// 토큰 테이블.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// 토큰의 다이제스트/소유자/용도/만료 시각을 저장합니다. 평문은 저장하지 않습니다.
    async fn insert_token(&self, token: &Token) -> StoreResult<()>;

    /// 다이제스트와 용도가 일치하고 `now` 이후에 만료되는 토큰의 소유자를 조회합니다.
    ///
    /// 잘못된 토큰, 만료, 다른 용도, 삭제된 토큰 모두 `StoreError::RecordNotFound`로
    /// 구분 없이 반환합니다.
    async fn get_user_for_token(
        &self,
        scope: TokenScope,
        digest: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<User>;

    /// 사용자의 해당 용도 토큰을 모두 삭제합니다.
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> StoreResult<()>;
}

/// 권한 테이블.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// 사용자의 권한 코드 집합을 조회합니다.
    async fn get_all_for_user(&self, user_id: i64) -> StoreResult<Permissions>;

    /// 사용자에게 권한 코드를 부여합니다.
    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> StoreResult<()>;
}

/// 카탈로그 레코드 테이블.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_record(&self, record: Record) -> StoreResult<Record>;

    async fn get_record(&self, id: i64) -> StoreResult<Record>;

    /// 버전 펜스 갱신. `record.version`은 적재 시점에 관찰한 값이어야 합니다.
    async fn update_record(&self, record: &Record) -> StoreResult<Record>;

    async fn delete_record(&self, id: i64) -> StoreResult<()>;

    /// 제목 단어(전부 포함)와 장르(전부 포함)로 필터링한 페이지를 반환합니다.
    async fn list_records(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> StoreResult<(Vec<Record>, Metadata)>;
}
