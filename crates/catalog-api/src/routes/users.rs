//! 사용자 가입과 계정 활성화.
//!
//! 가입 직후의 계정은 비활성 상태입니다. 발급된 활성화 토큰은 응답 본문에
//! 담기지 않고 로그로만 남습니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use catalog_core::{validate_token_plaintext, NewUser, StoreError, Token, TokenScope, User};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::hash_password;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

/// 가입 요청.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 500, message = "must be between 1 and 500 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "must be between 8 and 72 characters"))]
    pub password: String,
}

/// 활성화 요청.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivateUserRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// POST /users
///
/// 비활성 사용자를 만들고 기본 권한과 활성화 토큰을 부여합니다.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<RegisterUserRequest>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;

    let password_hash = hash_password(&input.password)?;
    let user = state
        .repos
        .users
        .insert_user(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            activated: false,
        })
        .await?;

    // 권한 부여나 토큰 발급이 실패하면 방금 만든 사용자를 지워 재가입을 막지 않음
    let token = match grant_and_issue(&state, user.id).await {
        Ok(token) => token,
        Err(err) => {
            if let Err(cleanup) = state.repos.users.delete_user(user.id).await {
                tracing::error!(
                    user_id = user.id,
                    error = %cleanup,
                    "Failed to remove partially registered user"
                );
            }
            return Err(err);
        }
    };

    tracing::info!(
        user_id = user.id,
        activation_token = %token.plaintext,
        expiry = %token.expiry,
        "User registered, activation token issued"
    );

    Ok((StatusCode::ACCEPTED, Json(UserEnvelope { user })))
}

/// 새 사용자에게 기본 권한을 부여하고 활성화 토큰을 발급합니다.
async fn grant_and_issue(state: &AppState, user_id: i64) -> ApiResult<Token> {
    state
        .repos
        .permissions
        .add_for_user(user_id, &state.config.auth.default_permissions)
        .await?;

    let token = state
        .tokens
        .issue(
            user_id,
            state.config.auth.activation_token_ttl(),
            TokenScope::Activation,
        )
        .await?;
    Ok(token)
}

/// PUT /users/activated
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<ActivateUserRequest>,
) -> ApiResult<Json<UserEnvelope>> {
    validate_token_plaintext(&input.token).map_err(|msg| ApiError::invalid_field("token", msg))?;

    let mut user = match state
        .tokens
        .user_for_token(TokenScope::Activation, &input.token)
        .await
    {
        Ok(user) => user,
        Err(StoreError::RecordNotFound) => {
            return Err(ApiError::invalid_field(
                "token",
                "invalid or expired activation token",
            ))
        }
        Err(e) => return Err(e.into()),
    };

    user.activated = true;
    let user = state.repos.users.update_user(&user).await?;

    state
        .tokens
        .revoke_all(TokenScope::Activation, user.id)
        .await?;

    tracing::info!(user_id = user.id, "User activated");
    Ok(Json(UserEnvelope { user }))
}

pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/activated", put(activate_user))
}
