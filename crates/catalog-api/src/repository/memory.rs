//! 인메모리 저장소.
//!
//! 데이터베이스 없이 실행할 때(개발, 테스트) 사용합니다. 모든 테이블이 하나의
//! 비동기 뮤텍스 아래에 있으므로 조건부 갱신은 잠금 안에서 원자적으로 수행됩니다.

use async_trait::async_trait;
use catalog_core::{
    Filters, Metadata, NewUser, PermissionStore, Permissions, Record, RecordStore, StoreError,
    StoreResult, Token, TokenScope, TokenStore, User, UserStore,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredToken {
    user_id: i64,
    scope: TokenScope,
    expiry: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    last_user_id: i64,
    tokens: HashMap<Vec<u8>, StoredToken>,
    permissions: HashMap<i64, BTreeSet<String>>,
    records: BTreeMap<i64, Record>,
    last_record_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except_id: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except_id && u.email.eq_ignore_ascii_case(email))
    }
}

/// 인메모리 저장소. 네 가지 저장소 trait을 모두 구현합니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        tables.last_user_id += 1;
        let stored = User {
            id: tables.last_user_id,
            created_at: Utc::now(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            activated: user.activated,
            version: 1,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let tables = self.tables.lock().await;
        tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(StoreError::RecordNotFound)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::DuplicateEmail);
        }

        let stored = tables
            .users
            .get_mut(&user.id)
            .filter(|stored| stored.version == user.version)
            .ok_or(StoreError::EditConflict)?;

        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.activated = user.activated;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.users.remove(&id).ok_or(StoreError::RecordNotFound)?;
        tables.tokens.retain(|_, t| t.user_id != id);
        tables.permissions.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, token: &Token) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&token.user_id) {
            return Err(StoreError::Database(format!(
                "token owner {} does not exist",
                token.user_id
            )));
        }
        tables.tokens.insert(
            token.digest.clone(),
            StoredToken {
                user_id: token.user_id,
                scope: token.scope,
                expiry: token.expiry,
            },
        );
        Ok(())
    }

    async fn get_user_for_token(
        &self,
        scope: TokenScope,
        digest: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        let tables = self.tables.lock().await;
        tables
            .tokens
            .get(digest)
            .filter(|t| t.scope == scope && t.expiry > now)
            .and_then(|t| tables.users.get(&t.user_id))
            .cloned()
            .ok_or(StoreError::RecordNotFound)
    }

    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .tokens
            .retain(|_, t| !(t.scope == scope && t.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn get_all_for_user(&self, user_id: i64) -> StoreResult<Permissions> {
        let tables = self.tables.lock().await;
        Ok(tables
            .permissions
            .get(&user_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .permissions
            .entry(user_id)
            .or_default()
            .extend(codes.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_record(&self, record: Record) -> StoreResult<Record> {
        let mut tables = self.tables.lock().await;
        tables.last_record_id += 1;
        let stored = Record {
            id: tables.last_record_id,
            created_at: Utc::now(),
            version: 1,
            ..record
        };
        tables.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_record(&self, id: i64) -> StoreResult<Record> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        let tables = self.tables.lock().await;
        tables
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::RecordNotFound)
    }

    async fn update_record(&self, record: &Record) -> StoreResult<Record> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .records
            .get_mut(&record.id)
            .filter(|stored| stored.version == record.version)
            .ok_or(StoreError::EditConflict)?;

        stored.title = record.title.clone();
        stored.year = record.year;
        stored.runtime = record.runtime;
        stored.genres = record.genres.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete_record(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound)
    }

    async fn list_records(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> StoreResult<(Vec<Record>, Metadata)> {
        let tables = self.tables.lock().await;
        let wanted_words = words(title);

        let mut rows: Vec<Record> = tables
            .records
            .values()
            .filter(|r| wanted_words.is_subset(&words(&r.title)))
            .filter(|r| genres.iter().all(|g| r.genres.contains(g)))
            .cloned()
            .collect();

        let column = filters.sort_column().unwrap_or("id");
        let descending = matches!(filters.sort_direction(), catalog_core::SortDirection::Desc);
        rows.sort_by(|a, b| {
            let ord = compare_by(a, b, column);
            let ord = if descending { ord.reverse() } else { ord };
            ord.then(a.id.cmp(&b.id))
        });

        let total = rows.len() as i64;
        let page: Vec<Record> = rows
            .into_iter()
            .skip(filters.offset().max(0) as usize)
            .take(filters.limit().max(0) as usize)
            .collect();

        Ok((page, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}

/// 제목을 소문자 단어 집합으로 나눕니다.
fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn compare_by(a: &Record, b: &Record, column: &str) -> Ordering {
    match column {
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "runtime" => a.runtime.cmp(&b.runtime),
        _ => a.id.cmp(&b.id),
    }
}
