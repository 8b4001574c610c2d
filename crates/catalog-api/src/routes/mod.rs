//! API 라우트.
//!
//! 모든 endpoint는 `/api/v1` 아래에 있습니다.
//!
//! # 라우트 구조
//!
//! - `/api/v1/healthcheck` - 헬스 체크
//! - `/api/v1/users` - 가입, 활성화
//! - `/api/v1/tokens/authentication` - 인증 토큰 발급/폐기
//! - `/api/v1/records` - 카탈로그 레코드
//!
//! # 미들웨어 순서 (바깥 → 안)
//!
//! request-id 부여 → trace → request-id 전파 → 메트릭 → 내부 에러 로깅 →
//! panic 복구 → 타임아웃 → CORS → 요청 수 제한 → 신원 확인 → 핸들러

pub mod health;
pub mod records;
pub mod tokens;
pub mod users;

pub use health::{health_router, HealthResponse, SystemInfo};
pub use records::{records_router, CreateRecordRequest, RecordEnvelope, RecordListResponse};
pub use tokens::{tokens_router, AuthenticationTokenResponse, CreateTokenRequest};
pub use users::{users_router, ActivateUserRequest, RegisterUserRequest, UserEnvelope};

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::middleware::{log_internal_errors, metrics_layer, rate_limit_middleware};
use crate::state::AppState;

/// 요청 ID 헤더
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 전체 API 라우터 생성.
///
/// 서브 라우터를 `/api/v1` 아래에 조합하고 미들웨어 스택을 적용합니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health_router())
        .merge(users_router())
        .merge(tokens_router())
        .merge(records_router())
        .method_not_allowed_fallback(method_not_allowed);

    let router = Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let router = match cors_layer(&state.config.server.cors_trusted_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.server.request_timeout(),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_internal_errors))
        .layer(middleware::from_fn(metrics_layer))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}

/// CORS 미들웨어 구성.
///
/// 신뢰 origin이 하나도 없으면 CORS 헤더를 붙이지 않습니다.
fn cors_layer(trusted_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = trusted_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    tracing::info!("CORS configured with {} trusted origins", origins.len());
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::OPTIONS,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(60)),
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

/// 핸들러 panic을 500 응답으로 바꿉니다. 상세 내용은 내부 에러 로그로 남습니다.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::body::{to_bytes, Body};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(app: Router, request: Request) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn app() -> Router {
        create_api_router(Arc::new(create_test_state()))
    }

    #[tokio::test]
    async fn test_unknown_route_uses_error_envelope() {
        let (status, headers, body) = call(
            app(),
            Request::builder()
                .uri("/api/v1/nowhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(headers.contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_method_not_allowed_uses_error_envelope() {
        let (status, _, body) = call(
            app(),
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/v1/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
        assert_eq!(
            body["message"],
            "the DELETE method is not supported for this resource"
        );
    }

    #[tokio::test]
    async fn test_healthcheck_is_public_and_varies_on_authorization() {
        let (status, headers, body) = call(
            app(),
            Request::builder()
                .uri("/api/v1/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "available");
        assert_eq!(headers.get(header::VARY).unwrap(), "Authorization");
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_propagated() {
        let (_, headers, _) = call(
            app(),
            Request::builder()
                .uri("/api/v1/healthcheck")
                .header(REQUEST_ID_HEADER, "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-123");
    }

    #[test]
    fn test_cors_layer_requires_trusted_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["https://example.com".to_string()]).is_some());
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response
            .extensions()
            .get::<crate::error::InternalErrorDetail>()
            .cloned()
            .unwrap();
        assert!(detail.0.contains("boom"));
    }
}
