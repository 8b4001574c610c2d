//! PostgreSQL 저장소.
//!
//! 버전 펜스 갱신은 `UPDATE ... WHERE id = $n AND version = $m RETURNING version`
//! 단일 문장으로 수행합니다. 여러 서버 프로세스 사이의 동시성 보장은 이 문장의
//! 원자성에만 의존합니다.

use async_trait::async_trait;
use catalog_core::{
    Filters, Metadata, NewUser, PermissionStore, Permissions, Record, RecordStore, Runtime,
    StoreError, StoreResult, Token, TokenScope, TokenStore, User, UserStore,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

/// 이메일 UNIQUE 제약 이름 (migrations 참고)
const USERS_EMAIL_KEY: &str = "users_email_key";

const USER_COLUMNS: &str =
    "users.id, users.created_at, users.name, users.email::text AS email, users.password_hash, users.activated, users.version";

// ================================================================================================
// Rows
// ================================================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    created_at: DateTime<Utc>,
    name: String,
    email: String,
    password_hash: String,
    activated: bool,
    version: i32,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            activated: row.activated,
            version: row.version,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    /// 목록 조회에서만 채워지는 전체 행 수
    #[sqlx(default)]
    total_records: i64,
    id: i64,
    created_at: DateTime<Utc>,
    title: String,
    year: i32,
    runtime: i32,
    genres: Vec<String>,
    version: i32,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            title: row.title,
            year: row.year,
            runtime: Runtime(row.runtime),
            genres: row.genres,
            version: row.version,
        }
    }
}

/// 이메일 조회 SQL. 매개변수를 citext로 캐스팅해야 text = text 비교로
/// 해석되지 않고 대소문자를 무시합니다.
fn user_by_email_sql() -> String {
    format!("SELECT {USER_COLUMNS} FROM users WHERE users.email = $1::citext")
}

fn db_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::RecordNotFound,
        sqlx::Error::Database(ref db) if db.constraint() == Some(USERS_EMAIL_KEY) => {
            StoreError::DuplicateEmail
        }
        other => StoreError::Database(other.to_string()),
    }
}

// ================================================================================================
// Store
// ================================================================================================

/// PostgreSQL 저장소.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, activated)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.activated)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.into())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&user_by_email_sql())
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.into())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let version: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET name = $1, email = $2, password_hash = $3, activated = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING version
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.activated)
        .bind(user.id)
        .bind(user.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let version = version.ok_or(StoreError::EditConflict)?;
        Ok(User {
            version,
            ..user.clone()
        })
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        // tokens, users_permissions는 ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_token(&self, token: &Token) -> StoreResult<()> {
        sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)")
            .bind(&token.digest)
            .bind(token.user_id)
            .bind(token.expiry)
            .bind(token.scope.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }

    async fn get_user_for_token(
        &self,
        scope: TokenScope,
        digest: &[u8],
        now: DateTime<Utc>,
    ) -> StoreResult<User> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            INNER JOIN tokens ON users.id = tokens.user_id
            WHERE tokens.hash = $1 AND tokens.scope = $2 AND tokens.expiry > $3
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(digest)
            .bind(scope.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.into())
    }

    async fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
            .bind(scope.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}

#[async_trait]
impl PermissionStore for PgStore {
    async fn get_all_for_user(&self, user_id: i64) -> StoreResult<Permissions> {
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT permissions.code
            FROM permissions
            INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
            WHERE users_permissions.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(codes.into_iter().collect())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users_permissions (user_id, permission_id)
            SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(codes)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_record(&self, record: Record) -> StoreResult<Record> {
        let (id, created_at, version): (i64, DateTime<Utc>, i32) = sqlx::query_as(
            r#"
            INSERT INTO records (title, year, runtime, genres)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, version
            "#,
        )
        .bind(&record.title)
        .bind(record.year)
        .bind(record.runtime.minutes())
        .bind(&record.genres)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Record {
            id,
            created_at,
            version,
            ..record
        })
    }

    async fn get_record(&self, id: i64) -> StoreResult<Record> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, created_at, title, year, runtime, genres, version FROM records WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn update_record(&self, record: &Record) -> StoreResult<Record> {
        let version: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE records
            SET title = $1, year = $2, runtime = $3, genres = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING version
            "#,
        )
        .bind(&record.title)
        .bind(record.year)
        .bind(record.runtime.minutes())
        .bind(&record.genres)
        .bind(record.id)
        .bind(record.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let version = version.ok_or(StoreError::EditConflict)?;
        Ok(Record {
            version,
            ..record.clone()
        })
    }

    async fn delete_record(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }

        let result = sqlx::query("DELETE FROM records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound);
        }
        Ok(())
    }

    async fn list_records(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> StoreResult<(Vec<Record>, Metadata)> {
        // 정렬 컬럼은 안전 목록에서 온 값만 SQL에 들어감
        let column = filters.sort_column().unwrap_or("id");
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total_records, id, created_at, title, year, runtime, genres, version
            FROM records
            WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 = '')
            AND (genres @> $2 OR $2 = '{{}}')
            ORDER BY {column} {direction}, id ASC
            LIMIT $3 OFFSET $4
            "#,
            direction = filters.sort_direction().as_sql(),
        );

        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(title)
            .bind(genres)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let total = rows.first().map(|r| r.total_records).unwrap_or(0);
        let records = rows.into_iter().map(Record::from).collect();

        Ok((records, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_lookup_compares_as_citext() {
        let sql = user_by_email_sql();
        assert!(sql.ends_with("WHERE users.email = $1::citext"), "{sql}");
        assert!(sql.contains("users.email::text AS email"));
    }
}
