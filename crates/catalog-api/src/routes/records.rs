//! 카탈로그 레코드 endpoint.
//!
//! | Method | Path | 게이트 |
//! |--------|------|--------|
//! | GET | /records | `records:read` |
//! | POST | /records | `records:write` |
//! | GET | /records/{id} | `records:read` |
//! | PATCH | /records/{id} | `records:write` + 기대 버전 |
//! | DELETE | /records/{id} | `records:write` |

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use catalog_core::{validate_record, Filters, Metadata, Record, RecordPatch, Runtime, Validator};
use serde::{Deserialize, Serialize};

use crate::auth::{Authorized, ReadRecords, WriteRecords};
use crate::concurrency::{guarded_update, ExpectedVersion};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

/// 레코드 생성 요청. 빠진 필드는 0/빈 값이 되어 검증에서 걸러집니다.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateRecordRequest {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordEnvelope {
    pub record: Record,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub records: Vec<Record>,
    pub metadata: Metadata,
}

/// 경로의 id. 숫자가 아니거나 1보다 작으면 404.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(ApiError::NotFound)
}

/// 정수 쿼리 값. 없으면 기본값, 정수가 아니면 필드 에러를 기록하고 기본값.
fn read_int(params: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match params.get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

fn read_csv(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    params
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// GET /records
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    _access: Authorized<ReadRecords>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<RecordListResponse>> {
    let mut v = Validator::new();

    let title = params.get("title").cloned().unwrap_or_default();
    let genres = read_csv(&params, "genres");
    let filters = Filters {
        page: read_int(&params, "page", 1, &mut v),
        page_size: read_int(&params, "page_size", 20, &mut v),
        sort: params
            .get("sort")
            .cloned()
            .unwrap_or_else(|| "id".to_string()),
        ..Default::default()
    };
    filters.validate(&mut v);
    v.finish().map_err(ApiError::ValidationFailed)?;

    let (records, metadata) = state
        .repos
        .records
        .list_records(&title, &genres, &filters)
        .await?;

    Ok(Json(RecordListResponse { records, metadata }))
}

/// POST /records
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    _access: Authorized<WriteRecords>,
    ApiJson(input): ApiJson<CreateRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    let draft = Record::draft(input.title, input.year, input.runtime, input.genres);
    validate_record(&draft).map_err(ApiError::ValidationFailed)?;

    let record = state.repos.records.insert_record(draft).await?;
    let location = format!("/api/v1/records/{}", record.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecordEnvelope { record }),
    ))
}

/// GET /records/{id}
pub async fn show_record(
    State(state): State<Arc<AppState>>,
    _access: Authorized<ReadRecords>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordEnvelope>> {
    let id = parse_id(&id)?;
    let record = state.repos.records.get_record(id).await?;
    Ok(Json(RecordEnvelope { record }))
}

/// PATCH /records/{id}
pub async fn update_record(
    State(state): State<Arc<AppState>>,
    _access: Authorized<WriteRecords>,
    Path(id): Path<String>,
    expected: ExpectedVersion,
    ApiJson(patch): ApiJson<RecordPatch>,
) -> ApiResult<Json<RecordEnvelope>> {
    let id = parse_id(&id)?;

    let record = guarded_update(state.repos.records.as_ref(), id, &expected, |record| {
        record.apply(patch);
        validate_record(record).map_err(ApiError::ValidationFailed)
    })
    .await?;

    Ok(Json(RecordEnvelope { record }))
}

/// DELETE /records/{id}
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    _access: Authorized<WriteRecords>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.repos.records.delete_record(id).await?;
    Ok(Json(serde_json::json!({ "message": "record successfully deleted" })))
}

pub fn records_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route(
            "/records/{id}",
            get(show_record).patch(update_record).delete(delete_record),
        )
}
