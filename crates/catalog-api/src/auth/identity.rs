//! 요청 신원 확인.
//!
//! `Authorization` 헤더를 읽어 요청마다 [`Identity`]를 확정하고 요청 확장에
//! 한 번 기록합니다. 이후 단계와 핸들러는 [`CurrentIdentity`]로 읽습니다.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, VARY},
        request::Parts,
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use catalog_core::{validate_token_plaintext, Identity, StoreError, TokenScope};

use crate::auth::TokenService;
use crate::error::ApiError;
use crate::state::AppState;

/// `Authorization` 헤더 값으로 신원을 확정합니다.
///
/// - 헤더 없음, 또는 값이 비어 있거나 공백뿐 → `Identity::Anonymous`
/// - `Bearer <token>` 형식이 아니거나 토큰 모양이 틀림 → `InvalidAuthToken`
///   (저장소 조회 전에 판정)
/// - 일치하는 인증 토큰 없음 → `InvalidAuthToken`
/// - 그 밖의 저장소 실패 → `Internal`
pub async fn resolve_identity(
    header: Option<&HeaderValue>,
    tokens: &TokenService,
) -> Result<Identity, ApiError> {
    let Some(header) = header else {
        return Ok(Identity::Anonymous);
    };

    let value = header.to_str().map_err(|_| ApiError::InvalidAuthToken)?;
    if value.trim().is_empty() {
        return Ok(Identity::Anonymous);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, credential] = parts.as_slice() else {
        return Err(ApiError::InvalidAuthToken);
    };
    if *scheme != "Bearer" {
        return Err(ApiError::InvalidAuthToken);
    }
    validate_token_plaintext(credential).map_err(|_| ApiError::InvalidAuthToken)?;

    match tokens
        .user_for_token(TokenScope::Authentication, credential)
        .await
    {
        Ok(user) => Ok(Identity::Authenticated(user)),
        Err(StoreError::RecordNotFound) => Err(ApiError::InvalidAuthToken),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// 신원 확인 미들웨어.
///
/// 모든 응답에 `Vary: Authorization`을 붙입니다.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = resolve_identity(request.headers().get(AUTHORIZATION), &state.tokens).await;

    let mut response = match resolved {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "authorization header rejected");
            err.into_response()
        }
    };

    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

/// 확정된 요청 신원 추출기.
///
/// 신원이 기록되지 않은 요청(미들웨어 누락)은 내부 에러입니다.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| {
                ApiError::Internal("request identity missing: authenticate layer not applied".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use catalog_core::{NewUser, UserStore};

    async fn service_with_user() -> (TokenService, String) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "hash".to_string(),
                activated: true,
            })
            .await
            .unwrap();
        let service = TokenService::new(store);
        let token = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();
        (service, token.plaintext)
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let (service, _) = service_with_user().await;
        let identity = resolve_identity(None, &service).await.unwrap();
        assert!(identity.is_anonymous());
    }

    #[tokio::test]
    async fn test_blank_header_is_anonymous() {
        let (service, _) = service_with_user().await;
        for value in ["", " ", "\t  "] {
            let header = HeaderValue::from_str(value).unwrap();
            let identity = resolve_identity(Some(&header), &service).await.unwrap();
            assert!(identity.is_anonymous(), "header {value:?}");
        }
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let (service, token) = service_with_user().await;
        let header = HeaderValue::from_str(&format!("Bearer {token}")).unwrap();
        let identity = resolve_identity(Some(&header), &service).await.unwrap();
        assert_eq!(identity.user().map(|u| u.email.as_str()), Some("bob@example.com"));
    }

    #[tokio::test]
    async fn test_malformed_headers_rejected() {
        let (service, token) = service_with_user().await;
        let cases = [
            format!("Basic {token}"),
            format!("Bearer  {token}"),
            format!("Bearer {token} extra"),
            token.clone(),
            "Bearer short".to_string(),
        ];
        for case in cases {
            let header = HeaderValue::from_str(&case).unwrap();
            let result = resolve_identity(Some(&header), &service).await;
            assert!(
                matches!(result, Err(ApiError::InvalidAuthToken)),
                "header {case:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let (service, _) = service_with_user().await;
        let header = HeaderValue::from_str(&format!("Bearer {}", "A".repeat(43))).unwrap();
        let result = resolve_identity(Some(&header), &service).await;
        assert!(matches!(result, Err(ApiError::InvalidAuthToken)));
    }

    #[tokio::test]
    async fn test_missing_identity_is_internal_error() {
        let request = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let result = CurrentIdentity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }
}
