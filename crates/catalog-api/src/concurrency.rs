//! 낙관적 동시성 제어.
//!
//! 레코드 수정은 다음 순서를 따릅니다.
//!
//! 1. 현재 행과 `version`을 적재
//! 2. 클라이언트가 `X-Expected-Version`을 보냈고 적재한 버전과 다르면 쓰기 없이 `EditConflict`
//! 3. 저장소의 조건부 갱신 "id와 관찰한 version이 일치하는 행만 갱신하고 version + 1"
//! 4. 갱신된 행이 없으면(그 사이 다른 쓰기가 버전을 올림) `EditConflict`
//!
//! 같은 버전을 관찰한 동시 쓰기 중 정확히 하나만 성공합니다. 원자성은 저장소가
//! 보장하며 프로세스 내부 잠금은 사용하지 않습니다.

use axum::{extract::FromRequestParts, http::request::Parts};
use catalog_core::{Record, RecordStore};

use crate::error::ApiError;

/// 기대 버전 요청 헤더
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// `X-Expected-Version` 헤더 추출기.
///
/// 헤더가 없으면 `None`. 숫자로 읽을 수 없는 값은 어떤 버전과도 일치하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub Option<String>);

impl<S> FromRequestParts<S> for ExpectedVersion
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = match parts.headers.get(EXPECTED_VERSION_HEADER) {
            None => None,
            Some(v) => Some(
                v.to_str()
                    .map_err(|_| ApiError::EditConflict)?
                    .trim()
                    .to_string(),
            ),
        };
        Ok(ExpectedVersion(value))
    }
}

impl ExpectedVersion {
    /// 적재한 버전과 비교합니다. 헤더가 없으면 항상 통과합니다.
    pub fn ensure_matches(&self, loaded: i32) -> Result<(), ApiError> {
        match &self.0 {
            None => Ok(()),
            Some(expected) if expected.parse::<i32>().ok() == Some(loaded) => Ok(()),
            Some(expected) => {
                tracing::debug!(expected = %expected, loaded, "expected version mismatch");
                Err(ApiError::EditConflict)
            }
        }
    }
}

/// 적재 → 기대 버전 확인 → 수정 → 조건부 갱신.
///
/// `mutate`는 적재한 레코드를 바꾸고 검증합니다. 실패하면 쓰기 없이 에러를 반환합니다.
pub async fn guarded_update<F>(
    store: &dyn RecordStore,
    id: i64,
    expected: &ExpectedVersion,
    mutate: F,
) -> Result<Record, ApiError>
where
    F: FnOnce(&mut Record) -> Result<(), ApiError> + Send,
{
    let mut record = store.get_record(id).await?;
    expected.ensure_matches(record.version)?;

    mutate(&mut record)?;

    let updated = store.update_record(&record).await?;
    Ok(updated)
}
