//! 통합 테스트 공용 도우미.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use catalog_api::{create_api_router, hash_password, AppState};
use catalog_core::{AppConfig, NewUser, TokenScope, User};
use serde_json::Value;
use tower::ServiceExt;

/// 요청 수 제한을 끈 인메모리 상태.
pub fn test_state() -> Arc<AppState> {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    Arc::new(AppState::in_memory(config))
}

pub fn app(state: &Arc<AppState>) -> Router {
    create_api_router(state.clone())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// 요청 빌더 래퍼.
pub struct Call {
    builder: axum::http::request::Builder,
    body: Option<Value>,
}

impl Call {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            builder: Request::builder().method(method).uri(uri),
            body: None,
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.builder = self
            .builder
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub async fn send(self, app: &Router) -> TestResponse {
        let request = match self.body {
            Some(body) => self
                .builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => self.builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// 저장소에 직접 사용자를 만들고 권한을 부여합니다.
pub async fn seed_user(
    state: &AppState,
    email: &str,
    activated: bool,
    permissions: &[&str],
) -> User {
    let user = state
        .repos
        .users
        .insert_user(NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash_password("pa55word").unwrap(),
            activated,
        })
        .await
        .unwrap();

    let codes: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    state
        .repos
        .permissions
        .add_for_user(user.id, &codes)
        .await
        .unwrap();

    user
}

/// 인증 토큰 평문을 발급합니다.
pub async fn auth_token(state: &AppState, user_id: i64) -> String {
    state
        .tokens
        .issue(user_id, chrono::Duration::hours(1), TokenScope::Authentication)
        .await
        .unwrap()
        .plaintext
}
