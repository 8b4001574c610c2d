//! 사용자와 요청 신원.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 저장소에 기록된 사용자.
///
/// `version`은 사용자 행이 갱신될 때마다 1씩 증가합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    /// Argon2 PHC 형식 해시
    #[serde(skip)]
    pub password_hash: String,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

/// 가입 요청으로 생성되는 사용자 (아직 id가 없음).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
}

/// 요청에 부착되는 신원.
///
/// 자격 증명이 없으면 `Anonymous`입니다. 저장소 행과 연결되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(User),
}

impl Identity {
    /// 인증된 사용자를 반환합니다.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}
