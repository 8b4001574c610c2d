//! 인증 토큰 발급과 폐기.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use catalog_core::{StoreError, Token, TokenScope};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{verify_password, Authorized, SignedIn};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

/// 인증 토큰 발급 요청.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct CreateTokenRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "must be between 8 and 72 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthenticationTokenResponse {
    pub authentication_token: Token,
}

/// POST /tokens/authentication
///
/// 없는 이메일과 틀린 비밀번호는 같은 응답(401)을 받습니다.
pub async fn create_authentication_token(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;

    let user = match state.repos.users.get_user_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::RecordNotFound) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&input.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(
            user.id,
            state.config.auth.authentication_token_ttl(),
            TokenScope::Authentication,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthenticationTokenResponse {
            authentication_token: token,
        }),
    ))
}

/// DELETE /tokens/authentication
///
/// 호출자의 인증 토큰을 모두 폐기합니다.
pub async fn revoke_authentication_tokens(
    State(state): State<Arc<AppState>>,
    access: Authorized<SignedIn>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .tokens
        .revoke_all(TokenScope::Authentication, access.user.id)
        .await?;

    tracing::info!(user_id = access.user.id, "Authentication tokens revoked");
    Ok(Json(serde_json::json!({
        "message": "authentication tokens successfully revoked"
    })))
}

pub fn tokens_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/tokens/authentication",
        post(create_authentication_token).delete(revoke_authentication_tokens),
    )
}
