//! 필드 단위 검증 에러 수집.
//!
//! 검증 실패는 `필드 → 메시지` 맵으로 응답됩니다. 한 필드에는 처음 기록된
//! 메시지만 유지합니다.

use std::collections::BTreeMap;

/// 필드별 검증 에러 맵.
pub type FieldErrors = BTreeMap<String, String>;

/// 검증 에러 수집기.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 검사를 통과했는지 확인합니다.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 필드 에러를 추가합니다. 이미 기록된 필드는 덮어쓰지 않습니다.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// `ok`가 거짓이면 필드 에러를 추가합니다.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// 수집한 에러를 반환합니다. 에러가 없으면 `Ok(())`.
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }
}
