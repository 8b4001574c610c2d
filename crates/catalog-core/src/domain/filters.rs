//! 목록 조회 필터와 페이지 메타데이터.

use serde::Serialize;

use crate::validation::Validator;

/// 레코드 목록에서 허용되는 정렬 키. `-` 접두사는 내림차순.
pub const RECORD_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

const MAX_PAGE: i64 = 10_000_000;
const MAX_PAGE_SIZE: i64 = 100;

/// 정렬 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// 페이지/정렬 필터.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: "id".to_string(),
            sort_safelist: RECORD_SORT_SAFELIST,
        }
    }
}

impl Filters {
    /// 범위와 정렬 키를 검사합니다.
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            self.sort_safelist.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }

    /// 정렬 컬럼 이름. 안전 목록에 있는 값만 반환합니다.
    pub fn sort_column(&self) -> Option<&'static str> {
        self.sort_safelist
            .iter()
            .copied()
            .find(|safe| *safe == self.sort)
            .map(|safe| safe.trim_start_matches('-'))
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// 목록 응답의 페이지 메타데이터. 결과가 없으면 모든 필드가 생략됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_and_direction() {
        let filters = Filters {
            sort: "-year".to_string(),
            ..Default::default()
        };
        assert_eq!(filters.sort_column(), Some("year"));
        assert_eq!(filters.sort_direction(), SortDirection::Desc);

        let filters = Filters {
            sort: "year; DROP TABLE records".to_string(),
            ..Default::default()
        };
        assert_eq!(filters.sort_column(), None);
    }

    #[test]
    fn test_validate_ranges() {
        let filters = Filters {
            page: 0,
            page_size: 101,
            sort: "rating".to_string(),
            ..Default::default()
        };
        let mut v = Validator::new();
        filters.validate(&mut v);
        let errors = v.into_errors();
        assert_eq!(errors["page"], "must be greater than zero");
        assert_eq!(errors["page_size"], "must be a maximum of 100");
        assert_eq!(errors["sort"], "invalid sort value");
    }

    #[test]
    fn test_limit_offset() {
        let filters = Filters {
            page: 3,
            page_size: 20,
            ..Default::default()
        };
        assert_eq!(filters.limit(), 20);
        assert_eq!(filters.offset(), 40);
    }

    #[test]
    fn test_metadata() {
        assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());

        let meta = Metadata::calculate(41, 2, 20);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.total_records, 41);

        let json = serde_json::to_string(&Metadata::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
