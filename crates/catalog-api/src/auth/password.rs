//! 비밀번호 해싱.
//!
//! Argon2id PHC 문자열로 저장하고 검증합니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
    #[error("stored password hash is malformed")]
    InvalidHashFormat,
    #[error("password verification failed: {0}")]
    VerificationFailed(String),
}

/// 평문 비밀번호를 Argon2id로 해싱합니다. 솔트는 매번 새로 생성됩니다.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// 저장된 해시와 평문 비밀번호를 비교합니다.
///
/// 불일치는 에러가 아니라 `Ok(false)`입니다. 해시가 손상되었거나 검증 중
/// 다른 문제가 생긴 경우에만 에러를 반환합니다.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
