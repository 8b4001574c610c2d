//! 사용자 권한 코드 집합.

use std::collections::BTreeSet;

/// 카탈로그 조회 권한
pub const RECORDS_READ: &str = "records:read";

/// 카탈로그 생성/수정/삭제 권한
pub const RECORDS_WRITE: &str = "records:write";

/// 한 사용자가 가진 권한 코드 집합.
///
/// 요청마다 저장소에서 새로 읽으며 캐시하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 권한 코드 포함 여부.
    pub fn includes(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
