//! 토큰 발급, 조회, 폐기.
//!
//! 평문은 [`Token`]에 담겨 발급 시점에만 호출자에게 돌아가며, 저장소에는
//! 다이제스트와 소유자/용도/만료 시각만 기록됩니다.

use std::sync::Arc;

use catalog_core::{
    token_digest, StoreError, StoreResult, Token, TokenError, TokenScope, TokenStore, User,
};
use chrono::Utc;
use thiserror::Error;

use crate::error::ApiError;
use crate::metrics::record_token_issued;

/// 토큰 발급 에러.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::Token(e) => e.into(),
            IssueError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// 토큰 저장소 위의 발급/조회 서비스.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// 새 토큰을 생성해 저장하고, 평문이 담긴 토큰을 반환합니다.
    pub async fn issue(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        scope: TokenScope,
    ) -> Result<Token, IssueError> {
        let token = Token::new(user_id, ttl, scope, Utc::now())?;
        self.store.insert_token(&token).await?;
        record_token_issued(scope);
        Ok(token)
    }

    /// 평문 토큰의 소유자를 조회합니다.
    ///
    /// 잘못된 토큰, 만료, 다른 용도 모두 `StoreError::RecordNotFound`입니다.
    /// 조회는 토큰을 소비하지 않습니다.
    pub async fn user_for_token(&self, scope: TokenScope, plaintext: &str) -> StoreResult<User> {
        let digest = token_digest(plaintext);
        self.store
            .get_user_for_token(scope, &digest, Utc::now())
            .await
    }

    /// 사용자의 해당 용도 토큰을 모두 삭제합니다.
    pub async fn revoke_all(&self, scope: TokenScope, user_id: i64) -> StoreResult<()> {
        self.store.delete_all_for_user(scope, user_id).await?;
        tracing::debug!(user_id, scope = %scope, "tokens revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use catalog_core::{NewUser, UserStore};

    async fn setup() -> (Arc<MemoryStore>, TokenService, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                activated: true,
            })
            .await
            .unwrap();
        let service = TokenService::new(store.clone());
        (store, service, user)
    }

    #[tokio::test]
    async fn test_issue_then_lookup() {
        let (_store, service, user) = setup().await;
        let token = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();

        let found = service
            .user_for_token(TokenScope::Authentication, &token.plaintext)
            .await
            .unwrap();
        assert_eq!(found.id, user.id);

        // 조회는 토큰을 소비하지 않음
        assert!(service
            .user_for_token(TokenScope::Authentication, &token.plaintext)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wrong_scope_is_not_found() {
        let (_store, service, user) = setup().await;
        let token = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Activation)
            .await
            .unwrap();

        let result = service
            .user_for_token(TokenScope::Authentication, &token.plaintext)
            .await;
        assert!(matches!(result, Err(StoreError::RecordNotFound)));
    }

    #[tokio::test]
    async fn test_expired_is_not_found() {
        let (_store, service, user) = setup().await;
        let token = service
            .issue(user.id, chrono::Duration::seconds(-1), TokenScope::Authentication)
            .await
            .unwrap();

        let result = service
            .user_for_token(TokenScope::Authentication, &token.plaintext)
            .await;
        assert!(matches!(result, Err(StoreError::RecordNotFound)));
    }

    #[tokio::test]
    async fn test_tampered_is_not_found() {
        let (_store, service, user) = setup().await;
        let token = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();

        let mut tampered = token.plaintext.clone();
        let last = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(last);

        let result = service
            .user_for_token(TokenScope::Authentication, &tampered)
            .await;
        assert!(matches!(result, Err(StoreError::RecordNotFound)));
    }

    #[tokio::test]
    async fn test_revoke_all_only_touches_scope() {
        let (_store, service, user) = setup().await;
        let auth = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();
        let activation = service
            .issue(user.id, chrono::Duration::hours(1), TokenScope::Activation)
            .await
            .unwrap();

        service
            .revoke_all(TokenScope::Authentication, user.id)
            .await
            .unwrap();

        assert!(service
            .user_for_token(TokenScope::Authentication, &auth.plaintext)
            .await
            .is_err());
        assert!(service
            .user_for_token(TokenScope::Activation, &activation.plaintext)
            .await
            .is_ok());
    }
}
