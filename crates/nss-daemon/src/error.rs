//! 데몬 에러 타입.

use std::time::Duration;

use nss_core::CacheError;
use nss_source::SourceError;
use thiserror::Error;

use crate::status::WorkerStatus;

/// 한 사이클 안에서 발생하는 에러. 워커 밖으로 전파되지 않고 통계에만 기록됩니다.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// 기대한 이전 상태가 아니어서 전환 실패 (예: 사이클 도중 정지 요청)
    #[error("상태 불일치: {next}(으)로 전환하려면 {expected} 상태여야 하지만 현재 {actual} 상태")]
    StateInconsistency {
        expected: WorkerStatus,
        actual: WorkerStatus,
        next: WorkerStatus,
    },

    /// 데이터 소스 조회 실패. 캐시 파일은 건드리지 않음
    #[error("조회 실패: {0}")]
    Fetch(#[from] SourceError),

    /// 캐시 파일 쓰기 실패. 이전 캐시 파일이 유지됨
    #[error("캐시 쓰기 실패: {0}")]
    Write(#[from] CacheError),

    /// 쓰기 태스크가 패닉하거나 취소됨
    #[error("캐시 쓰기 태스크 실패: {0}")]
    WriteTask(#[from] tokio::task::JoinError),
}

/// 설정 에러. 시작 시점에 치명적입니다.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 파일 읽기, 파싱, 역직렬화 실패 (알 수 없는 source 종류 포함)
    #[error("설정 로드 실패: {0}")]
    Load(#[from] config::ConfigError),

    /// 값 검증 실패
    #[error("잘못된 설정: {0}")]
    Invalid(String),
}

/// 매니저 에러.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 상태 엔드포인트 주소 바인딩 실패
    #[error("상태 서버 시작 실패 ({addr}): {source}")]
    StatusServer {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// 종료 대기 시간 안에 정지하지 않은 워커가 있음 (해당 태스크는 abort됨)
    #[error("종료 타임아웃 ({timeout:?}): 정지하지 않은 워커 {pending:?}")]
    ShutdownTimeout {
        timeout: Duration,
        pending: Vec<String>,
    },
}
