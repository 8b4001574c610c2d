//! 카탈로그 API 서버.
//!
//! 설정을 로드하고 저장소를 연결한 뒤 `/api/v1` 라우터와 `/metrics`를 서빙합니다.

use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use catalog_api::metrics::setup_metrics_recorder;
use catalog_api::routes::create_api_router;
use catalog_api::server::{serve, shutdown_signal};
use catalog_api::state::AppState;
use catalog_core::{init_logging, AppConfig, LogConfig};

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!(
        environment = %config.server.environment,
        "Starting catalog API server..."
    );

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = config.server.shutdown_grace();

    let state = match config.database.url.clone() {
        Some(url) => AppState::connect(config, &url)
            .await
            .context("failed to connect to database")?,
        None => {
            warn!("DATABASE_URL not set, using in-memory store (development only)");
            AppState::in_memory(config)
        }
    };
    info!(
        version = %state.version,
        store = state.repos.backend,
        rate_limit = state.rate_limiter.is_enabled(),
        "Application state initialized"
    );

    // 유휴 클라이언트 정리 태스크 (프로세스 종료까지 실행)
    let _sweeper = state.rate_limiter.spawn_sweeper();

    // 메트릭 라우터 (별도 상태, 요청 수 제한 제외)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = Router::new()
        .merge(metrics_router)
        .merge(create_api_router(Arc::new(state)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    serve(listener, app, shutdown, grace).await?;

    info!("Server stopped");
    Ok(())
}
