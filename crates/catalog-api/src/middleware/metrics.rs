//! HTTP 요청 metrics middleware.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_duration, record_http_request, record_http_response};

/// 어떤 라우트에도 매칭되지 않은 요청의 경로 라벨.
pub const UNMATCHED_PATH_LABEL: &str = "unmatched";

/// 요청의 경로 라벨. 라우트 템플릿(`MatchedPath`)만 쓰고 원시 URI는 쓰지 않습니다.
pub fn path_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH_LABEL.to_string())
}

/// 요청 수, 응답 수(상태별), 처리 시간을 기록합니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let path = path_label(&request);

    record_http_request(&method, &path);
    let response = next.run(request).await;

    record_http_response(&method, &path, response.status().as_u16());
    record_http_duration(&method, &path, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    /// 계산된 라벨을 응답 헤더로 돌려주는 테스트용 레이어.
    async fn echo_label(request: Request, next: Next) -> Response {
        let label = path_label(&request);
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&label) {
            response.headers_mut().insert("x-path-label", value);
        }
        response
    }

    fn labelled_app() -> Router {
        Router::new()
            .route("/records/{id}", get(|| async { StatusCode::NO_CONTENT }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(echo_label))
    }

    async fn label_for(uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = labelled_app().oneshot(request).await.unwrap();
        let label = response
            .headers()
            .get("x-path-label")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        (response.status(), label)
    }

    #[tokio::test]
    async fn test_metrics_layer_passes_response_through() {
        let app = Router::new()
            .route("/records/{id}", get(|| async { StatusCode::NO_CONTENT }))
            .layer(middleware::from_fn(metrics_layer));

        let request = Request::builder()
            .uri("/records/17")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_matched_route_uses_template() {
        let (status, label) = label_for("/records/17").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(label, "/records/{id}");
    }

    #[tokio::test]
    async fn test_unmatched_paths_share_one_label() {
        for uri in ["/wp-admin/setup.php", "/random/4f1c9e2a", "/records/17/extra"] {
            let (status, label) = label_for(uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(label, UNMATCHED_PATH_LABEL, "uri: {uri}");
        }
    }

    #[test]
    fn test_request_without_route_is_unmatched() {
        let request = Request::builder()
            .uri("/anything/123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(path_label(&request), "unmatched");
    }
}
