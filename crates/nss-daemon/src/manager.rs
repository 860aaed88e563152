//! 워커 매니저.
//!
//! 계정 유형마다 워커 하나를 만들고 각각 독립된 tokio 태스크에서 실행합니다.
//! 상태 조회는 각 워커의 읽기 락만 잡으며 워커를 멈추지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use nss_core::AccountKind;
use nss_source::DataSource;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{CacheConfig, DaemonConfig};
use crate::error::{ConfigError, ManagerError, WorkerError};
use crate::status::{StatusReport, WorkerStatus};
use crate::worker::Worker;

/// 고정된 워커 집합을 관리합니다.
pub struct Manager {
    workers: Vec<Arc<Worker>>,
    tasks: Mutex<JoinSet<AccountKind>>,
}

impl Manager {
    /// 모든 계정 유형에 대해 워커를 생성합니다. 아직 시작하지 않습니다.
    pub fn new(source: Arc<dyn DataSource>, interval: Duration, cache: &CacheConfig) -> Self {
        let workers = AccountKind::ALL
            .iter()
            .map(|&kind| {
                Arc::new(Worker::new(
                    kind,
                    Arc::clone(&source),
                    cache.target(kind),
                    interval,
                ))
            })
            .collect();

        Self {
            workers,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// 설정에 지정된 데이터 소스로 매니저를 생성합니다.
    pub fn from_config(config: &DaemonConfig) -> Result<Self, ConfigError> {
        let source = config.build_source()?;
        Ok(Self::new(source, config.update_interval(), &config.cache))
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn worker(&self, kind: AccountKind) -> Option<&Arc<Worker>> {
        self.workers.iter().find(|w| w.kind() == kind)
    }

    /// 워커마다 태스크를 하나씩 띄웁니다. 두 번째 호출은 무시됩니다.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            warn!("워커가 이미 실행 중입니다");
            return;
        }

        for worker in &self.workers {
            let worker = Arc::clone(worker);
            info!(worker = worker.name(), "워커 시작");
            tasks.spawn(async move {
                worker.run().await;
                info!(worker = worker.name(), "워커 완료");
                worker.kind()
            });
        }
    }

    /// 모든 워커에 정지 신호를 보냅니다. 워커 종료를 기다리지 않습니다.
    pub async fn stop_all(&self) {
        for worker in &self.workers {
            debug!(worker = worker.name(), "정지 신호 전송");
            worker.stop().await;
        }
    }

    /// 시작된 모든 태스크가 끝날 때까지 기다립니다. 타임아웃이 없습니다.
    pub async fn join_all(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(kind) => debug!(worker = kind.name(), "워커 태스크 합류"),
                Err(e) if e.is_panic() => error!(error = %e, "워커 태스크 패닉"),
                Err(e) => warn!(error = %e, "워커 태스크 취소됨"),
            }
        }
    }

    /// 정지 신호를 보내고 `timeout` 동안 종료를 기다립니다.
    ///
    /// 시간 안에 끝나지 않은 워커 태스크는 abort하고 `ManagerError::ShutdownTimeout`을 반환합니다.
    /// `timeout`이 `None`이면 무한히 기다립니다.
    pub async fn shutdown(&self, timeout: Option<Duration>) -> Result<(), ManagerError> {
        self.stop_all().await;

        let Some(timeout) = timeout else {
            self.join_all().await;
            return Ok(());
        };

        if tokio::time::timeout(timeout, self.join_all()).await.is_ok() {
            info!("모든 워커 종료");
            return Ok(());
        }

        let report = self.status_report().await;
        let pending: Vec<String> = report
            .workers
            .iter()
            .filter(|w| w.status != WorkerStatus::Stopped)
            .map(|w| w.name.clone())
            .collect();
        warn!(
            timeout_secs = timeout.as_secs(),
            pending = ?pending,
            "종료 대기 시간 초과, 남은 워커 태스크 중단"
        );

        self.tasks.lock().await.shutdown().await;
        Err(ManagerError::ShutdownTimeout { timeout, pending })
    }

    /// 모든 워커의 현재 상태 스냅샷.
    pub async fn status_report(&self) -> StatusReport {
        let workers = join_all(self.workers.iter().map(|w| w.report())).await;
        StatusReport { workers }
    }

    /// 루프 없이 모든 워커에서 한 사이클씩 동시에 실행합니다.
    pub async fn run_once(&self) -> Vec<(AccountKind, Result<usize, WorkerError>)> {
        join_all(self.workers.iter().map(|worker| async move {
            (worker.kind(), worker.run_once().await)
        }))
        .await
    }
}
