//! 베어러 토큰 생성과 다이제스트.
//!
//! 평문 토큰은 보안 난수 32바이트를 URL-safe base64(패딩 없음)로 인코딩한
//! 43자 문자열입니다. 저장되는 것은 평문의 SHA-256 다이제스트뿐이며,
//! 평문은 발급 시점에 한 번만 호출자에게 반환됩니다.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// 난수 바이트 수
pub const TOKEN_BYTES: usize = 32;

/// 평문 토큰 길이 (32바이트 → base64 43자)
pub const TOKEN_PLAINTEXT_LEN: usize = 43;

/// 토큰 생성 에러.
#[derive(Debug, Error)]
pub enum TokenError {
    /// 보안 난수원을 사용할 수 없음
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
}

/// 토큰 용도.
///
/// 한 용도로 발급된 토큰은 다른 용도로 사용할 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    /// API 인증
    Authentication,
    /// 계정 활성화
    Activation,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Authentication => "authentication",
            TokenScope::Activation => "activation",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 생성된 평문과 다이제스트 쌍.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub digest: Vec<u8>,
}

/// 보안 난수로 새 토큰을 생성합니다.
///
/// # Errors
///
/// 운영체제 난수원을 읽을 수 없으면 `TokenError::RandomSource`.
pub fn generate_token() -> Result<IssuedToken, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::RandomSource(e.to_string()))?;

    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let digest = token_digest(&plaintext);

    Ok(IssuedToken { plaintext, digest })
}

/// 평문 토큰의 SHA-256 다이제스트.
pub fn token_digest(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// 평문 토큰의 형태(길이, 문자 집합)를 검사합니다.
///
/// 형태가 맞지 않으면 사용자에게 보여줄 메시지를 반환합니다.
pub fn validate_token_plaintext(plaintext: &str) -> Result<(), &'static str> {
    if plaintext.is_empty() {
        return Err("must be provided");
    }
    if plaintext.len() != TOKEN_PLAINTEXT_LEN {
        return Err("must be 43 characters long");
    }
    let url_safe = plaintext
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !url_safe {
        return Err("contains invalid characters");
    }
    Ok(())
}

/// 발급된 토큰.
///
/// 평문은 직렬화 시 한 번 클라이언트에 전달되고, 저장소에는 다이제스트만 기록됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub digest: Vec<u8>,
    #[serde(skip)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: TokenScope,
}

impl Token {
    /// `now + ttl`에 만료되는 새 토큰을 생성합니다.
    pub fn new(
        user_id: i64,
        ttl: chrono::Duration,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        let IssuedToken { plaintext, digest } = generate_token()?;
        Ok(Self {
            plaintext,
            digest,
            user_id,
            expiry: now + ttl,
            scope,
        })
    }
}
