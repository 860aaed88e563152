//! # NSS Core
//!
//! 이름 서비스(NSS) 캐시 데몬의 핵심 타입을 제공합니다.
//!
//! 이 크레이트는 데몬 전반에서 사용되는 기본 구성요소를 제공합니다:
//! - 계정 레코드 (사용자, 그룹, SSH 키) 모델
//! - 캐시 파일 라인 포맷 렌더링
//! - 원자적 캐시 파일 쓰기
//! - 로깅 인프라

pub mod account;
pub mod cache;
pub mod error;
pub mod logging;

pub use account::{AccountKind, AccountSet, Group, SshKey, User};
pub use cache::{CacheTarget, CacheWriter, DEFAULT_CACHE_MODE};
pub use error::{CacheError, Result};
pub use logging::{init_logging, LogConfig, LogFormat};
