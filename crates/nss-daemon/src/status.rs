//! 워커 상태와 통계.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 워커 상태 머신.
///
/// `Ready → Running → Fetching → Syncing → Running → … → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerStatus {
    /// 폴링 루프 시작 전
    Ready,
    /// 유휴 (다음 조회 직전 또는 대기 중)
    Running,
    /// 데이터 소스 조회 중
    Fetching,
    /// 조회 결과를 캐시 파일에 쓰는 중
    Syncing,
    /// 정지 요청됨, 다음 대기 지점에서 루프 종료
    Stopping,
    /// 루프 종료 (최종 상태)
    Stopped,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Fetching => "FETCHING",
            Self::Syncing => "SYNCING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 워커 통계. 워커 자신의 태스크만 갱신합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// 마지막 사이클 종료 시각 (성공/실패 무관)
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// 마지막 성공 시각
    pub last_success: Option<DateTime<Utc>>,
    /// 마지막 에러 메시지. 성공하면 초기화
    pub last_error: Option<String>,
    /// 연속 실패 횟수
    pub consecutive_failures: u32,
    /// 완료된 사이클 수
    pub cycles: u64,
}

/// 워커 하나의 상태 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub name: String,
    pub status: WorkerStatus,
    pub stats: WorkerStats,
}

/// 전체 워커 상태 스냅샷 (best-effort, 워커를 멈추지 않고 수집).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub workers: Vec<WorkerReport>,
}

impl StatusReport {
    /// `(워커 이름, 상태 문자열)` 목록
    pub fn statuses(&self) -> Vec<(&str, &'static str)> {
        self.workers
            .iter()
            .map(|w| (w.name.as_str(), w.status.as_str()))
            .collect()
    }

    pub fn status_of(&self, name: &str) -> Option<WorkerStatus> {
        self.workers
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.status)
    }

    /// 모든 워커가 최종 상태인지
    pub fn all_stopped(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.status == WorkerStatus::Stopped)
    }

    /// 워커별 상태 요약 로그 출력
    pub fn log_summary(&self) {
        for worker in &self.workers {
            tracing::info!(
                worker = %worker.name,
                status = %worker.status,
                cycles = worker.stats.cycles,
                consecutive_failures = worker.stats.consecutive_failures,
                last_success = ?worker.stats.last_success,
                last_error = worker.stats.last_error.as_deref().unwrap_or("-"),
                "워커 상태"
            );
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for worker in &self.workers {
            writeln!(f, "Worker {} status: {}", worker.name, worker.status)?;
        }
        Ok(())
    }
}
