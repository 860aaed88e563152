//! 계정 유형 하나를 담당하는 폴링 워커.
//!
//! 워커는 자신의 태스크에서만 상태를 바꾸며, 매니저나 상태 조회는 읽기 락으로만 접근합니다.
//!
//! # 한 사이클
//!
//! 1. `Running → Fetching`
//! 2. 데이터 소스 조회 (실패 시 캐시를 건드리지 않고 중단)
//! 3. `Fetching → Syncing`
//! 4. 렌더링 후 캐시 파일 원자적 쓰기
//! 5. `Syncing → Running`
//!
//! 각 전환은 이전 상태를 확인하는 compare-and-swap입니다. 사이클 도중 정지 요청으로
//! 상태가 `Stopping`이 되면 다음 전환이 실패하고 사이클이 에러로 끝납니다.
//!
//! # 스케줄링
//!
//! 사이클이 끝나면 상태를 `Running`으로 되돌린 뒤 정지 신호와 고정 주기 타이머 중
//! 먼저 오는 쪽을 기다립니다. 실패가 반복되어도 주기는 바뀌지 않으며 (backoff 없음)
//! 연속 실패 횟수로만 드러납니다. 루프는 정지 신호로만 종료됩니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use nss_core::{AccountKind, CacheTarget, CacheWriter};
use nss_source::DataSource;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::status::{WorkerReport, WorkerStats, WorkerStatus};

/// 상태 변경 구독 채널 크기
const STATUS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct WorkerState {
    status: WorkerStatus,
    stats: WorkerStats,
}

/// 폴링 워커.
pub struct Worker {
    kind: AccountKind,
    source: Arc<dyn DataSource>,
    target: CacheTarget,
    interval: Duration,
    state: RwLock<WorkerState>,
    stop_token: CancellationToken,
    status_tx: broadcast::Sender<WorkerStatus>,
}

impl Worker {
    pub fn new(
        kind: AccountKind,
        source: Arc<dyn DataSource>,
        target: CacheTarget,
        interval: Duration,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            kind,
            source,
            target,
            interval,
            state: RwLock::new(WorkerState {
                status: WorkerStatus::Ready,
                stats: WorkerStats::default(),
            }),
            stop_token: CancellationToken::new(),
            status_tx,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn target(&self) -> &CacheTarget {
        &self.target
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn status(&self) -> WorkerStatus {
        self.state.read().await.status
    }

    pub async fn stats(&self) -> WorkerStats {
        self.state.read().await.stats.clone()
    }

    pub async fn report(&self) -> WorkerReport {
        let state = self.state.read().await;
        WorkerReport {
            name: self.name().to_string(),
            status: state.status,
            stats: state.stats.clone(),
        }
    }

    /// 이후 발생하는 상태 변경을 구독합니다. 같은 상태로의 재설정은 발행되지 않습니다.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_token.is_cancelled()
    }

    /// 현재 상태가 `expected`일 때만 `next`로 전환합니다.
    pub async fn transition(
        &self,
        expected: WorkerStatus,
        next: WorkerStatus,
    ) -> Result<(), WorkerError> {
        debug!(worker = self.name(), from = %expected, to = %next, "상태 전환");

        let mut state = self.state.write().await;
        if state.status != expected {
            return Err(WorkerError::StateInconsistency {
                expected,
                actual: state.status,
                next,
            });
        }
        state.status = next;
        let _ = self.status_tx.send(next);
        Ok(())
    }

    /// 이전 상태와 무관하게 상태를 설정합니다. `Running`, `Stopping`, `Stopped`에만 사용
    pub async fn set_status(&self, next: WorkerStatus) {
        let mut state = self.state.write().await;
        if state.status == next {
            return;
        }
        debug!(worker = self.name(), from = %state.status, to = %next, "상태 설정");
        state.status = next;
        let _ = self.status_tx.send(next);
    }

    /// 정지를 요청합니다.
    ///
    /// 루프 종료를 기다리지 않으며, 여러 번 호출해도 한 번 호출한 것과 같습니다.
    /// 진행 중인 조회/쓰기는 끝까지 실행되고 다음 대기 지점에서 루프가 종료됩니다.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if !matches!(state.status, WorkerStatus::Stopping | WorkerStatus::Stopped) {
                info!(worker = self.name(), "정지 요청 수신");
                state.status = WorkerStatus::Stopping;
                let _ = self.status_tx.send(WorkerStatus::Stopping);
            }
        }
        self.stop_token.cancel();
    }

    /// 폴링 루프. 정지 신호를 받을 때까지 반환하지 않습니다.
    pub async fn run(&self) {
        info!(
            worker = self.name(),
            source = self.source.name(),
            path = %self.target.path.display(),
            interval_secs = self.interval.as_secs(),
            "워커 루프 시작"
        );

        if self.stop_token.is_cancelled() {
            info!(worker = self.name(), "시작 전에 정지 요청됨, 사이클 없이 종료");
            self.set_status(WorkerStatus::Stopped).await;
            return;
        }

        self.set_status(WorkerStatus::Running).await;

        loop {
            // 사이클 에러는 통계에만 남고 루프는 계속된다
            let _ = self.run_cycle().await;

            self.set_status(WorkerStatus::Running).await;

            debug!(
                worker = self.name(),
                interval_secs = self.interval.as_secs(),
                "다음 사이클까지 대기"
            );
            tokio::select! {
                biased;
                _ = self.stop_token.cancelled() => {
                    info!(worker = self.name(), "정지 신호 수신, 루프 종료");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    debug!(worker = self.name(), "대기 종료, 다음 사이클 시작");
                }
            }
        }

        self.set_status(WorkerStatus::Stopped).await;
        info!(worker = self.name(), "워커 루프 종료");
    }

    /// 루프 없이 한 사이클만 실행하고 `Stopped`로 끝냅니다.
    pub async fn run_once(&self) -> Result<usize, WorkerError> {
        self.set_status(WorkerStatus::Running).await;
        let result = self.run_cycle().await;
        self.set_status(WorkerStatus::Stopped).await;
        result
    }

    /// 한 사이클을 실행하고 결과를 통계에 반영합니다.
    ///
    /// 성공 시 기록한 레코드 수를 반환합니다.
    pub async fn run_cycle(&self) -> Result<usize, WorkerError> {
        let start = Instant::now();
        let result = self.cycle().await;
        self.record(&result).await;

        match &result {
            Ok(count) => info!(
                worker = self.name(),
                records = *count,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "캐시 동기화 완료"
            ),
            Err(e @ WorkerError::StateInconsistency { .. }) => {
                warn!(worker = self.name(), error = %e, "사이클 중단")
            }
            Err(e) => error!(worker = self.name(), error = %e, "사이클 실패"),
        }
        result
    }

    async fn cycle(&self) -> Result<usize, WorkerError> {
        self.transition(WorkerStatus::Running, WorkerStatus::Fetching)
            .await?;

        let accounts = self.source.fetch(self.kind).await?;
        debug!(worker = self.name(), records = accounts.len(), "조회 완료");

        self.transition(WorkerStatus::Fetching, WorkerStatus::Syncing)
            .await?;

        let count = accounts.len();
        let contents = accounts.render();
        let target = self.target.clone();
        // 임시 파일 쓰기와 fsync는 blocking 풀에서 실행
        tokio::task::spawn_blocking(move || {
            CacheWriter::write_target(&target, contents.as_bytes())
        })
        .await??;

        self.transition(WorkerStatus::Syncing, WorkerStatus::Running)
            .await?;
        Ok(count)
    }

    async fn record(&self, result: &Result<usize, WorkerError>) {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let stats = &mut state.stats;

        stats.last_heartbeat = Some(now);
        stats.cycles += 1;
        match result {
            Ok(_) => {
                stats.last_success = Some(now);
                stats.last_error = None;
                stats.consecutive_failures = 0;
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());
                stats.consecutive_failures += 1;
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("kind", &self.kind)
            .field("source", &self.source.name())
            .field("target", &self.target)
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nss_core::User;
    use nss_source::StaticSource;

    fn user(name: &str, uid: &str) -> User {
        User {
            name: name.to_string(),
            password: "*".to_string(),
            uid: uid.to_string(),
            gid: "100".to_string(),
            gecos: name.to_string(),
            home_dir: format!("/home/{}", name),
            shell: "/bin/bash".to_string(),
        }
    }

    fn worker_in(dir: &std::path::Path, source: Arc<StaticSource>) -> Worker {
        Worker::new(
            AccountKind::Users,
            source,
            CacheTarget::new(dir.join("passwd.cache"), 0o644),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_transition_requires_expected_state() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_in(dir.path(), Arc::new(StaticSource::default()));

        let err = worker
            .transition(WorkerStatus::Running, WorkerStatus::Fetching)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::StateInconsistency {
                expected: WorkerStatus::Running,
                actual: WorkerStatus::Ready,
                next: WorkerStatus::Fetching,
            }
        ));
        assert_eq!(worker.status().await, WorkerStatus::Ready);

        worker.set_status(WorkerStatus::Running).await;
        worker
            .transition(WorkerStatus::Running, WorkerStatus::Fetching)
            .await
            .unwrap();
        assert_eq!(worker.status().await, WorkerStatus::Fetching);
    }

    #[tokio::test]
    async fn test_cycle_outside_running_is_state_inconsistency() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(StaticSource::new(vec![user("alice", "1001")], vec![], vec![]));
        let worker = worker_in(dir.path(), source.clone());

        // Ready 상태에서는 Running → Fetching 전환이 실패한다
        let err = worker.run_cycle().await.unwrap_err();
        assert!(matches!(err, WorkerError::StateInconsistency { .. }));
        assert_eq!(source.fetch_count(), 0);
        assert!(!dir.path().join("passwd.cache").exists());

        let stats = worker.stats().await;
        assert_eq!(stats.consecutive_failures, 1);
        assert!(stats.last_error.is_some());
        assert!(stats.last_heartbeat.is_some());
        assert!(stats.last_success.is_none());
    }

    #[tokio::test]
    async fn test_stats_reset_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(StaticSource::new(vec![user("alice", "1001")], vec![], vec![]));
        let worker = worker_in(dir.path(), source.clone());
        worker.set_status(WorkerStatus::Running).await;

        source.set_failure(Some("metadata down")).await;
        assert!(worker.run_cycle().await.is_err());
        worker.set_status(WorkerStatus::Running).await;
        assert!(worker.run_cycle().await.is_err());
        worker.set_status(WorkerStatus::Running).await;

        let stats = worker.stats().await;
        assert_eq!(stats.consecutive_failures, 2);
        assert_eq!(
            stats.last_error.as_deref(),
            Some("조회 실패: 데이터 소스 에러: metadata down")
        );

        source.set_failure(None).await;
        assert_eq!(worker.run_cycle().await.unwrap(), 1);

        let stats = worker.stats().await;
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.cycles, 3);
        assert!(stats.last_error.is_none());
        assert!(stats.last_success.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_cycle_writes_through_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(StaticSource::new(vec![user("alice", "1001")], vec![], vec![]));
        let worker = worker_in(dir.path(), source);
        worker.set_status(WorkerStatus::Running).await;

        // 런타임 스레드가 하나뿐이어도 쓰기 중에 상태 조회가 가능해야 한다
        let (written, status) = tokio::join!(worker.run_cycle(), async {
            tokio::task::yield_now().await;
            worker.status().await
        });

        assert_eq!(written.unwrap(), 1);
        assert!(matches!(
            status,
            WorkerStatus::Fetching | WorkerStatus::Syncing | WorkerStatus::Running
        ));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("passwd.cache")).unwrap(),
            "alice:*:1001:100:alice:/home/alice:/bin/bash\n"
        );
        assert_eq!(worker.status().await, WorkerStatus::Running);
    }

    #[tokio::test]
    async fn test_write_task_failure_is_reported() {
        let handle: tokio::task::JoinHandle<()> =
            tokio::task::spawn_blocking(|| panic!("disk gone"));
        let err: WorkerError = handle.await.unwrap_err().into();
        assert!(matches!(err, WorkerError::WriteTask(_)));
        assert!(err.to_string().starts_with("캐시 쓰기 태스크 실패"));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_in(dir.path(), Arc::new(StaticSource::default()));
        let mut rx = worker.subscribe();

        worker.stop().await;
        worker.stop().await;

        assert!(worker.is_stop_requested());
        assert_eq!(worker.status().await, WorkerStatus::Stopping);
        assert_eq!(rx.try_recv().unwrap(), WorkerStatus::Stopping);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_before_run_skips_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(StaticSource::default());
        let worker = worker_in(dir.path(), source.clone());

        worker.stop().await;
        worker.run().await;

        assert_eq!(worker.status().await, WorkerStatus::Stopped);
        assert_eq!(source.fetch_count(), 0);
    }
}
