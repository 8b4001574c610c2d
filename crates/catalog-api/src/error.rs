//! API 에러 타입과 JSON 에러 응답.
//!
//! 모든 엔드포인트는 같은 에러 봉투를 사용합니다.
//!
//! ```json
//! {
//!   "code": "EDIT_CONFLICT",
//!   "message": "unable to update the record due to an edit conflict, please try again"
//! }
//! ```
//!
//! 내부 에러는 클라이언트에 일반 메시지만 보여주고, 상세 내용은 응답 확장에
//! [`InternalErrorDetail`]로 실어 로깅 미들웨어가 요청 정보와 함께 기록합니다.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::{FieldErrors, StoreError, TokenError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::auth::PasswordError;

/// 내부 에러를 클라이언트에 보여줄 때 사용하는 일반 메시지
const INTERNAL_MESSAGE: &str = "the server encountered a problem and could not process your request";

/// JSON 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "NOT_FOUND", "VALIDATION_FAILED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 정보 (검증 실패 시 필드 → 메시지 맵)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 내부 에러 상세. 응답 확장으로 전달되며 본문에는 포함되지 않습니다.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// API 에러.
///
/// 각 변형은 하나의 HTTP 상태 코드에 대응합니다.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid or missing authentication token")]
    InvalidAuthToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("one or more fields failed validation")]
    ValidationFailed(FieldErrors),

    #[error("rate limit exceeded")]
    RateLimitExceeded {
        /// 다음 토큰까지 남은 초. 리필이 없으면 `None`
        retry_after: Option<u64>,
    },

    #[error("invalid authentication credentials")]
    InvalidCredentials,

    #[error("internal error: {0}")]
    Internal(String),
}

/// API 핸들러 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 단일 필드 검증 실패.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), message.into());
        ApiError::ValidationFailed(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidAuthToken
            | ApiError::AuthenticationRequired
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::InactiveAccount | ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidAuthToken => "INVALID_AUTH_TOKEN",
            ApiError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ApiError::InactiveAccount => "INACTIVE_ACCOUNT",
            ApiError::NotPermitted => "NOT_PERMITTED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::EditConflict => "EDIT_CONFLICT",
            ApiError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 클라이언트에 보여줄 응답 본문.
    pub fn to_response_body(&self) -> ApiErrorResponse {
        match self {
            ApiError::Internal(_) => ApiErrorResponse::new(self.code(), INTERNAL_MESSAGE),
            ApiError::ValidationFailed(errors) => {
                ApiErrorResponse::new(self.code(), self.to_string())
                    .with_details(serde_json::json!(errors))
            }
            _ => ApiErrorResponse::new(self.code(), self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.to_response_body())).into_response();

        match self {
            ApiError::InvalidAuthToken => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            ApiError::RateLimitExceeded {
                retry_after: Some(secs),
            } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            ApiError::Internal(detail) => {
                response.extensions_mut().insert(InternalErrorDetail(detail));
            }
            _ => {}
        }

        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound => ApiError::NotFound,
            StoreError::EditConflict => ApiError::EditConflict,
            StoreError::DuplicateEmail => {
                ApiError::invalid_field("email", "a user with this email address already exists")
            }
            StoreError::Database(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                fields.entry(field.to_string()).or_insert(message);
            }
        }
        ApiError::ValidationFailed(fields)
    }
}

/// JSON 본문 추출기. 파싱 실패를 [`ApiError::BadRequest`]로 응답합니다.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_contract() {
        assert_eq!(ApiError::InvalidAuthToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AuthenticationRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InactiveAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotPermitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::EditConflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::ValidationFailed(FieldErrors::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::RateLimitExceeded { retry_after: None }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_invalid_token_sets_bearer_challenge() {
        let response = ApiError::InvalidAuthToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_AUTH_TOKEN");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        let detail = response.extensions().get::<InternalErrorDetail>().cloned();
        assert_eq!(detail.map(|d| d.0), Some("connection refused".to_string()));

        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_validation_details() {
        let response = ApiError::invalid_field("title", "must be provided").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["details"]["title"], "must be provided");
    }

    #[test]
    fn test_retry_after_header() {
        let response = ApiError::RateLimitExceeded {
            retry_after: Some(3),
        }
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");

        let response = ApiError::RateLimitExceeded { retry_after: None }.into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::RecordNotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(StoreError::EditConflict),
            ApiError::EditConflict
        ));
        match ApiError::from(StoreError::DuplicateEmail) {
            ApiError::ValidationFailed(errors) => assert!(errors.contains_key("email")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            ApiError::from(StoreError::Database("timeout".into())),
            ApiError::Internal(_)
        ));
    }
}
