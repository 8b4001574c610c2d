//! 저장소 계층의 에러 타입.
//!
//! 저장소 구현(PostgreSQL, 인메모리)이 공통으로 반환하는 에러를 정의합니다.
//! 이름이 붙은 조건(`RecordNotFound`, `EditConflict`, `DuplicateEmail`)은
//! 호출 단계에서 직접 처리하고, 나머지는 `Database`로 감싸 내부 에러로 취급합니다.

use thiserror::Error;

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 조건에 맞는 행이 없음
    #[error("record not found")]
    RecordNotFound,

    /// 버전 펜스 불일치로 조건부 갱신이 적용되지 않음
    #[error("edit conflict")]
    EditConflict,

    /// 이메일 중복
    #[error("duplicate email")]
    DuplicateEmail,

    /// 기타 데이터베이스 에러
    #[error("database error: {0}")]
    Database(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Database("timeout".to_string());
        assert_eq!(err.to_string(), "database error: timeout");
    }
}
