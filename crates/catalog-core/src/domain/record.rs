//! 카탈로그 레코드.
//!
//! `version`은 낙관적 동시성 펜스입니다. 갱신이 성공할 때마다 정확히 1 증가합니다.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use thiserror::Error;

use crate::validation::{FieldErrors, Validator};

/// 가장 오래된 허용 연도
const MIN_YEAR: i32 = 1888;

/// 제목 최대 길이 (문자)
const MAX_TITLE_LEN: usize = 500;

/// 장르 최대 개수
const MAX_GENRES: usize = 5;

/// 상영 시간 (분).
///
/// JSON에서는 `"102 mins"` 형식의 문자열로 표현됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

/// 상영 시간 파싱 에러.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid runtime format")]
pub struct RuntimeParseError;

impl Runtime {
    pub fn minutes(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl std::str::FromStr for Runtime {
    type Err = RuntimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, unit) = s.split_once(' ').ok_or(RuntimeParseError)?;
        if unit != "mins" {
            return Err(RuntimeParseError);
        }
        minutes.parse().map(Runtime).map_err(|_| RuntimeParseError)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 카탈로그 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "is_zero_runtime")]
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub version: i32,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_zero_runtime(v: &Runtime) -> bool {
    v.0 == 0
}

impl Record {
    /// 저장 전 레코드 (id/버전은 저장소가 채웁니다).
    pub fn draft(title: String, year: i32, runtime: Runtime, genres: Vec<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            title,
            year,
            runtime,
            genres,
            version: 1,
        }
    }

    /// 부분 갱신을 적용합니다. 버전은 건드리지 않습니다.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(runtime) = patch.runtime {
            self.runtime = runtime;
        }
        if let Some(genres) = patch.genres {
            self.genres = genres;
        }
    }
}

/// 레코드 부분 갱신 입력.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// 레코드의 비즈니스 필드를 검증합니다.
pub fn validate_record(record: &Record) -> Result<(), FieldErrors> {
    validate_record_at(record, Utc::now().year())
}

fn validate_record_at(record: &Record, current_year: i32) -> Result<(), FieldErrors> {
    let mut v = Validator::new();

    v.check(!record.title.is_empty(), "title", "must be provided");
    v.check(
        record.title.chars().count() <= MAX_TITLE_LEN,
        "title",
        "must not be more than 500 characters long",
    );

    v.check(record.year != 0, "year", "must be provided");
    v.check(record.year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(
        record.year <= current_year,
        "year",
        "must not be in the future",
    );

    v.check(record.runtime.0 != 0, "runtime", "must be provided");
    v.check(record.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!record.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        record.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    let unique: HashSet<&String> = record.genres.iter().collect();
    v.check(
        unique.len() == record.genres.len(),
        "genres",
        "must not contain duplicate values",
    );

    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::draft(
            "Casablanca".to_string(),
            1942,
            Runtime(102),
            vec!["drama".to_string(), "romance".to_string()],
        )
    }

    #[test]
    fn test_runtime_json() {
        let json = serde_json::to_string(&Runtime(102)).unwrap();
        assert_eq!(json, r#""102 mins""#);

        let parsed: Runtime = serde_json::from_str(r#""95 mins""#).unwrap();
        assert_eq!(parsed, Runtime(95));

        assert!(serde_json::from_str::<Runtime>(r#""95""#).is_err());
        assert!(serde_json::from_str::<Runtime>(r#""95 minutes""#).is_err());
        assert!(serde_json::from_str::<Runtime>("95").is_err());
    }

    #[test]
    fn test_valid_record() {
        assert!(validate_record_at(&sample(), 2026).is_ok());
    }

    #[test]
    fn test_invalid_record_fields() {
        let mut record = sample();
        record.title = String::new();
        record.year = 1800;
        record.runtime = Runtime(-5);
        record.genres = vec!["drama".to_string(), "drama".to_string()];

        let errors = validate_record_at(&record, 2026).unwrap_err();
        assert_eq!(errors["title"], "must be provided");
        assert_eq!(errors["year"], "must be greater than 1888");
        assert_eq!(errors["runtime"], "must be a positive integer");
        assert_eq!(errors["genres"], "must not contain duplicate values");
    }

    #[test]
    fn test_future_year_and_too_many_genres() {
        let mut record = sample();
        record.year = 2030;
        record.genres = (0..6).map(|i| format!("g{i}")).collect();

        let errors = validate_record_at(&record, 2026).unwrap_err();
        assert_eq!(errors["year"], "must not be in the future");
        assert_eq!(errors["genres"], "must not contain more than 5 genres");
        assert!(!errors.contains_key("title"));
    }

    #[test]
    fn test_apply_patch_keeps_version() {
        let mut record = sample();
        record.version = 3;
        record.apply(RecordPatch {
            title: Some("Casablanca (Restored)".to_string()),
            runtime: Some(Runtime(103)),
            ..Default::default()
        });

        assert_eq!(record.title, "Casablanca (Restored)");
        assert_eq!(record.year, 1942);
        assert_eq!(record.runtime, Runtime(103));
        assert_eq!(record.version, 3);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let patch: RecordPatch = serde_json::from_str(r#"{"runtime": "103 mins"}"#).unwrap();
        assert_eq!(patch.runtime, Some(Runtime(103)));
        assert!(patch.title.is_none());

        let err = serde_json::from_str::<RecordPatch>(r#"{"titel": "Casablanca"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `titel`"), "{err}");
    }

    #[test]
    fn test_record_serialization() {
        let mut record = sample();
        record.id = 9;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["runtime"], "102 mins");
        assert_eq!(json["version"], 1);
        assert!(json.get("created_at").is_none());
    }
}
