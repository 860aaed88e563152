//! NSS 캐시 동기화 데몬.
//!
//! 원격 데이터 소스에서 계정 정보를 주기적으로 가져와 NSS 캐시 파일로 기록합니다:
//! - 계정 유형(users, groups, sshkeys)마다 독립적으로 동작하는 워커
//! - 워커를 생성, 시작, 정지하고 상태를 모으는 매니저
//! - TOML 설정 파일 + 환경변수 오버라이드
//! - 선택적인 `/stats/` 상태 HTTP 엔드포인트

pub mod config;
pub mod daemon;
pub mod error;
pub mod http;
pub mod manager;
pub mod status;
pub mod worker;

pub use config::{CacheConfig, DaemonConfig, SourceKind};
pub use daemon::{os_shutdown_signal, run_daemon, DaemonOptions, ShutdownSignal};
pub use error::{ConfigError, ManagerError, WorkerError};
pub use http::{serve_status, status_router};
pub use manager::Manager;
pub use status::{StatusReport, WorkerReport, WorkerStats, WorkerStatus};
pub use worker::Worker;
