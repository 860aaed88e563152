//! 데몬 실행 루프와 종료 신호 처리.
//!
//! | 신호 | 동작 |
//! |---|---|
//! | `SIGHUP`, `SIGQUIT` | 모든 워커 정지 후 대기 (`shutdown_timeout_secs` 한도) |
//! | `SIGINT`, `SIGTERM` | 워커를 기다리지 않고 즉시 종료 |
//!
//! `status_addr`가 설정되면 실행 중에 [`crate::http`] 상태 엔드포인트를 함께 띄웁니다.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::error::ManagerError;
use crate::http::serve_status;
use crate::manager::Manager;

/// 상태 서버의 남은 연결을 기다리는 최대 시간
const STATUS_SERVER_GRACE: Duration = Duration::from_secs(5);

/// 수신한 종료 신호 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// 워커 정지 후 종료를 기다림
    Graceful(&'static str),
    /// 워커를 기다리지 않고 바로 종료
    Immediate(&'static str),
}

/// 데몬 실행 옵션.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonOptions {
    pub shutdown_timeout: Option<Duration>,
    pub status_log_interval: Option<Duration>,
    pub status_addr: Option<SocketAddr>,
}

impl From<&DaemonConfig> for DaemonOptions {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            shutdown_timeout: config.shutdown_timeout(),
            status_log_interval: config.status_log_interval(),
            status_addr: config.status_addr,
        }
    }
}

/// 워커를 시작하고 `signal`이 완료될 때까지 실행합니다.
///
/// 정상 종료 신호면 모든 워커를 정지시키고 기다린 뒤 반환하며,
/// 즉시 종료 신호면 워커 태스크를 그대로 둔 채 반환합니다.
///
/// # Errors
///
/// - `ManagerError::StatusServer`: 상태 엔드포인트 주소를 바인딩하지 못함 (워커 시작 전)
/// - `ManagerError::ShutdownTimeout`: 정상 종료 중 대기 시간 초과
pub async fn run_daemon<F>(
    manager: Arc<Manager>,
    options: DaemonOptions,
    signal: F,
) -> Result<ShutdownSignal, ManagerError>
where
    F: Future<Output = ShutdownSignal>,
{
    // 주소 바인딩 실패는 워커를 띄우기 전에 치명적 에러로 처리
    let listener = match options.status_addr {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .map_err(|source| ManagerError::StatusServer { addr, source })?,
        ),
        None => None,
    };

    manager.start().await;

    let aux_token = CancellationToken::new();
    let logger = options
        .status_log_interval
        .map(|every| spawn_status_logger(Arc::clone(&manager), every, aux_token.clone()));
    let server = listener.map(|listener| {
        let manager = Arc::clone(&manager);
        let token = aux_token.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_status(listener, manager, token).await {
                warn!(error = %e, "상태 서버 종료");
            }
        })
    });

    let received = signal.await;

    aux_token.cancel();
    if let Some(handle) = logger {
        let _ = handle.await;
    }

    match received {
        ShutdownSignal::Graceful(name) => {
            info!(signal = name, "종료 신호 수신, 워커 정지 중...");
            if let Some(mut handle) = server {
                if tokio::time::timeout(STATUS_SERVER_GRACE, &mut handle)
                    .await
                    .is_err()
                {
                    handle.abort();
                }
            }
            let result = manager.shutdown(options.shutdown_timeout).await;
            manager.status_report().await.log_summary();
            result?;
        }
        ShutdownSignal::Immediate(name) => {
            info!(signal = name, "즉시 종료, 워커를 기다리지 않음");
            if let Some(handle) = server {
                handle.abort();
            }
        }
    }

    Ok(received)
}

/// 주기적으로 상태 요약을 로그로 남기는 태스크.
fn spawn_status_logger(
    manager: Arc<Manager>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // 첫 tick은 즉시 완료되므로 건너뜀

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => manager.status_report().await.log_summary(),
            }
        }
    })
}

/// OS 신호 핸들러를 설치하고, 첫 신호를 받으면 완료되는 future를 반환합니다.
#[cfg(unix)]
pub fn os_shutdown_signal() -> std::io::Result<impl Future<Output = ShutdownSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = hangup.recv() => ShutdownSignal::Graceful("SIGHUP"),
            _ = quit.recv() => ShutdownSignal::Graceful("SIGQUIT"),
            _ = interrupt.recv() => ShutdownSignal::Immediate("SIGINT"),
            _ = terminate.recv() => ShutdownSignal::Immediate("SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
pub fn os_shutdown_signal() -> std::io::Result<impl Future<Output = ShutdownSignal>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        ShutdownSignal::Immediate("Ctrl+C")
    })
}
