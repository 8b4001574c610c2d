//! 애플리케이션 공유 상태.
//!
//! 모든 핸들러가 `Arc<AppState>`로 공유합니다. 요청 간에 공유되는 가변 상태는
//! Rate Limiter의 클라이언트 맵뿐이며, 토큰/권한/버전은 요청마다 저장소에서 읽습니다.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::AppConfig;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use crate::auth::TokenService;
use crate::middleware::{RateLimitConfig, RateLimiter};
use crate::repository::Repositories;

/// 애플리케이션 상태.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub tokens: TokenService,
    pub rate_limiter: RateLimiter,
    pub started_at: DateTime<Utc>,
    pub version: String,
}

impl AppState {
    /// 저장소 묶음으로 상태를 만듭니다.
    pub fn new(config: AppConfig, repos: Repositories) -> Self {
        let rate_limiter = RateLimiter::new(RateLimitConfig::from(&config.rate_limit));
        Self {
            tokens: TokenService::new(repos.tokens.clone()),
            config: Arc::new(config),
            repos,
            rate_limiter,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 인메모리 저장소를 사용하는 상태.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Repositories::in_memory())
    }

    /// PostgreSQL 연결 풀을 만들고, 설정된 경우 마이그레이션을 적용합니다.
    pub async fn connect(config: AppConfig, database_url: &str) -> anyhow::Result<Self> {
        let db = &config.database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .connect(database_url)
            .await?;

        if db.run_migrations {
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self::new(config, Repositories::postgres(pool)))
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태. 인메모리 저장소를 쓰고 요청 수 제한을 끕니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    AppState::in_memory(config)
}
