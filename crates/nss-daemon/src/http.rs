//! 워커 상태 HTTP 엔드포인트.
//!
//! | 경로 | 응답 |
//! |---|---|
//! | `GET /stats`, `GET /stats/` | `Worker <name> status: <STATUS>` 텍스트 (워커당 한 줄) |
//! | `GET /stats.json` | 통계를 포함한 [`StatusReport`] JSON |
//!
//! 읽기 락만 사용하므로 요청이 워커 사이클을 막지 않습니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::manager::Manager;
use crate::status::StatusReport;

/// 상태 엔드포인트 라우터.
pub fn status_router(manager: Arc<Manager>) -> Router {
    Router::new()
        .route("/stats", get(stats_text))
        .route("/stats/", get(stats_text))
        .route("/stats.json", get(stats_json))
        .with_state(manager)
}

/// `shutdown`이 취소될 때까지 상태 엔드포인트를 서비스합니다.
pub async fn serve_status(
    listener: TcpListener,
    manager: Arc<Manager>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "상태 서버 시작");

    axum::serve(listener, status_router(manager))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn stats_text(State(manager): State<Arc<Manager>>) -> String {
    manager.status_report().await.to_string()
}

async fn stats_json(State(manager): State<Arc<Manager>>) -> Json<StatusReport> {
    Json(manager.status_report().await)
}
