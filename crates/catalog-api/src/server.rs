//! 서버 수명 주기.
//!
//! 종료 신호를 받으면 새 연결을 받지 않고, 진행 중인 요청을 최대 유예 시간까지
//! 기다린 뒤 남은 연결을 끊고 반환합니다.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 라우터를 서빙합니다.
///
/// 연결 주소(`ConnectInfo<SocketAddr>`)는 요청 수 제한의 클라이언트 식별에 사용됩니다.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "API server listening");

    let signal = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        _ = shutdown.cancelled() => {}
    }

    info!(
        grace_secs = grace.as_secs_f64(),
        "Shutdown initiated, draining in-flight requests"
    );

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined??;
            info!("Server stopped gracefully");
        }
        Err(_) => {
            warn!("Grace period elapsed, forcing shutdown");
            server.abort();
        }
    }

    Ok(())
}

/// Ctrl+C 또는 SIGTERM을 기다립니다.
///
/// 시그널 핸들러를 설치할 수 없으면 에러를 기록하고 해당 시그널은 무시합니다.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
