//! 저장소 구현.
//!
//! - [`PgStore`]: PostgreSQL (sqlx)
//! - [`MemoryStore`]: 데이터베이스가 설정되지 않았을 때와 테스트에서 사용

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use catalog_core::{PermissionStore, RecordStore, TokenStore, UserStore};
use sqlx::PgPool;

/// 핸들러가 사용하는 저장소 묶음.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub records: Arc<dyn RecordStore>,
    /// 저장소 종류 ("postgres" | "memory")
    pub backend: &'static str,
}

impl Repositories {
    /// 모든 테이블이 하나의 저장소를 공유하도록 구성합니다.
    fn shared<S>(store: Arc<S>, backend: &'static str) -> Self
    where
        S: UserStore + TokenStore + PermissionStore + RecordStore + 'static,
    {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            permissions: store.clone(),
            records: store,
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()), "memory")
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::shared(Arc::new(PgStore::new(pool)), "postgres")
    }
}
