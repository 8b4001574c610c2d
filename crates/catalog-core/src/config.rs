//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 기본값 → `config/default.toml`(선택) → `CATALOG__` 접두사 환경 변수 순서로
//! 덮어쓰며, `DATABASE_URL`은 `database.url`을 직접 덮어씁니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 요청 수 제한 설정
    pub rate_limit: RateLimitSettings,
    /// 토큰/권한 설정
    pub auth: AuthConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 실행 환경 (development | staging | production)
    pub environment: String,
    /// 종료 시 진행 중인 요청을 기다리는 최대 시간 (초)
    pub shutdown_grace_secs: u64,
    /// 요청 처리 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// CORS 허용 origin 목록. 비어 있으면 CORS 헤더를 내보내지 않습니다.
    pub cors_trusted_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            environment: "development".to_string(),
            shutdown_grace_secs: 5,
            request_timeout_secs: 30,
            cors_trusted_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 문자열. 없으면 인메모리 저장소를 사용합니다.
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 최소 연결 수
    pub min_connections: u32,
    /// 연결 획득 타임아웃 (초)
    pub acquire_timeout_secs: u64,
    /// 유휴 타임아웃 (초)
    pub idle_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 25,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 900,
            run_migrations: false,
        }
    }
}

/// 요청 수 제한 설정.
///
/// 클라이언트 IP별 토큰 버킷의 용량(`burst`)과 초당 리필량을 정의합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// 활성화 여부
    pub enabled: bool,
    /// 초당 리필되는 토큰 수
    pub requests_per_second: f64,
    /// 버킷 용량
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst: 4,
        }
    }
}

/// 토큰 및 권한 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 인증 토큰 유효 시간 (시간)
    pub authentication_token_ttl_hours: u64,
    /// 활성화 토큰 유효 시간 (시간)
    pub activation_token_ttl_hours: u64,
    /// 가입 시 부여하는 권한 코드
    pub default_permissions: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authentication_token_ttl_hours: 24,
            activation_token_ttl_hours: 72,
            default_permissions: vec!["records:read".to_string(), "records:write".to_string()],
        }
    }
}

impl AuthConfig {
    pub fn authentication_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.authentication_token_ttl_hours as i64)
    }

    pub fn activation_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.activation_token_ttl_hours as i64)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 에러가 아닙니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("CATALOG")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_trusted_origins")
                    .with_list_parse_key("auth.default_permissions")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?;

        let config = builder.build()?;
        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 설정값의 유효 범위를 검사합니다.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.rate_limit.requests_per_second < 0.0 {
            return Err(config::ConfigError::Message(
                "rate_limit.requests_per_second must not be negative".to_string(),
            ));
        }
        if self.auth.authentication_token_ttl_hours == 0
            || self.auth.activation_token_ttl_hours == 0
        {
            return Err(config::ConfigError::Message(
                "token ttl must be at least one hour".to_string(),
            ));
        }
        Ok(())
    }
}
