//! Rate limiting middleware.
//!
//! 클라이언트 IP별 Token Bucket으로 요청을 허용하거나 거부합니다.
//!
//! - 버킷 용량은 `burst_size`, 초당 `requests_per_second`만큼 리필되며 가득 찬 상태로 시작합니다.
//! - 클라이언트 맵은 하나의 뮤텍스로 보호되고, 요청마다 한 항목만 잠깐 갱신합니다.
//! - 백그라운드 스위퍼가 `sweep_interval`마다 `idle_timeout`보다 오래 조용한 항목을 제거합니다.
//! - 비활성화 상태에서는 모든 요청을 허용하며 맵을 건드리지 않습니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use catalog_core::RateLimitSettings;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::ApiError;
use crate::metrics::{record_rate_limit_decision, set_rate_limit_tracked_clients};

/// 스위퍼 실행 간격
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 이 시간보다 오래 요청이 없던 클라이언트는 스위프 대상
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Rate Limiter 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 초당 리필 토큰 수
    pub requests_per_second: f64,
    /// 버킷 용량
    pub burst_size: u32,
    /// 스위프 간격
    pub sweep_interval: Duration,
    /// 유휴 항목 제거 기준
    pub idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst_size: 4,
            sweep_interval: SWEEP_INTERVAL,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
            ..Default::default()
        }
    }

    /// 모든 요청을 허용하는 설정.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ..Self::new(settings.requests_per_second, settings.burst)
        }
    }
}

/// Token Bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        let max_tokens = f64::from(config.burst_size);
        Self {
            tokens: max_tokens,
            last_refill: now,
            max_tokens,
            refill_rate: config.requests_per_second.max(0.0),
        }
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// 다음 토큰까지 남은 초. 리필이 없으면 영원히 기다려야 하므로 `None`.
    fn time_until_next_token(&self) -> Option<f64> {
        if self.tokens >= 1.0 {
            Some(0.0)
        } else if self.refill_rate > 0.0 && self.max_tokens >= 1.0 {
            Some((1.0 - self.tokens) / self.refill_rate)
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Rate Limit 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited {
        /// 재시도까지 대기 시간 (초)
        retry_after: Option<u64>,
    },
}

/// IP별 Rate Limiter.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    clients: Arc<Mutex<HashMap<IpAddr, ClientEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 요청 하나를 허용할지 판정합니다.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let entry = clients.entry(ip).or_insert_with(|| ClientEntry {
            bucket: TokenBucket::new(&self.config, now),
            last_seen: now,
        });
        entry.last_seen = now;

        if entry.bucket.try_acquire(now) {
            RateLimitResult::Allowed
        } else {
            let retry_after = entry
                .bucket
                .time_until_next_token()
                .map(|secs| secs.ceil().max(1.0) as u64);
            RateLimitResult::Limited { retry_after }
        }
    }

    /// 유휴 항목을 제거하고 제거한 수를 반환합니다.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, entry| {
            now.saturating_duration_since(entry.last_seen) <= self.config.idle_timeout
        });
        set_rate_limit_tracked_clients(clients.len());
        before - clients.len()
    }

    /// 현재 추적 중인 클라이언트 수.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// 스위퍼 태스크를 시작합니다. 비활성화 상태면 시작하지 않습니다.
    ///
    /// 태스크는 취소되지 않으며 프로세스와 함께 종료됩니다.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            return None;
        }

        let limiter = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = limiter.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept idle rate limiter entries");
                }
            }
        }))
    }
}

/// Rate Limiting 미들웨어.
///
/// 거부된 요청은 이후 단계(신원 확인, 핸들러)에 도달하지 않습니다.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let ip = extract_client_ip(&request);

    match limiter.check(ip).await {
        RateLimitResult::Allowed => {
            record_rate_limit_decision("allowed");
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            record_rate_limit_decision("limited");
            tracing::warn!(client_ip = %ip, ?retry_after, "Rate limit exceeded");
            ApiError::RateLimitExceeded { retry_after }.into_response()
        }
    }
}

/// 요청에서 클라이언트 IP를 추출합니다.
///
/// `X-Forwarded-For`의 첫 주소, `X-Real-IP`, 연결 주소 순서로 확인합니다.
pub fn extract_client_ip(request: &Request) -> IpAddr {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
