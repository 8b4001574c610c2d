//! 내부 에러 로깅 middleware.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::InternalErrorDetail;

/// 응답에 [`InternalErrorDetail`]이 실려 있으면 요청 메서드/URL과 함께 기록합니다.
///
/// 상세 내용은 응답 확장에서 제거되어 이후 계층으로 전달되지 않습니다.
pub async fn log_internal_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;

    if let Some(InternalErrorDetail(detail)) =
        response.extensions_mut().remove::<InternalErrorDetail>()
    {
        tracing::error!(
            request_method = %method,
            request_url = %uri,
            error = %detail,
            "Internal server error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_detail_removed_from_response() {
        let app = Router::new()
            .route(
                "/fail",
                get(|| async { ApiError::Internal("disk full".to_string()) }),
            )
            .layer(middleware::from_fn(log_internal_errors));

        let request = Request::builder().uri("/fail").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<InternalErrorDetail>().is_none());
    }
}
