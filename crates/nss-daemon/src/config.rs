//! 데몬 설정.
//!
//! TOML 파일에서 읽고 `NSS_CACHE__` 접두사 환경변수로 덮어씁니다
//! (예: `NSS_CACHE__UPDATE_INTERVAL_SECS=60`, `NSS_CACHE__GCE_METADATA__PRIMARY_GID=1000`).
//!
//! ```toml
//! source = "gce_metadata"
//! update_interval_secs = 300
//!
//! [gce_metadata]
//! user_key = "nss-users"
//! group_key = "nss-groups"
//!
//! [cache]
//! passwd = "/etc/passwd.cache"
//! ```
//!
//! `status_addr`를 지정하면 `/stats/` 상태 엔드포인트를 엽니다 (기본값: 비활성화).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nss_core::{AccountKind, CacheTarget, DEFAULT_CACHE_MODE};
use nss_source::{DataSource, GceMetadataClient, GceMetadataConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nss-cache.toml";

/// 환경변수 오버라이드 접두사
const ENV_PREFIX: &str = "NSS_CACHE";

/// 데이터 소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// GCE 메타데이터 서버
    GceMetadata,
}

/// 캐시 파일 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub passwd: PathBuf,
    pub group: PathBuf,
    pub sshkey: PathBuf,
    /// 캐시 파일 권한 비트 (TOML에는 10진수로 기록, 0o644 = 420)
    pub mode: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            passwd: AccountKind::Users.default_cache_path().into(),
            group: AccountKind::Groups.default_cache_path().into(),
            sshkey: AccountKind::SshKeys.default_cache_path().into(),
            mode: DEFAULT_CACHE_MODE,
        }
    }
}

impl CacheConfig {
    /// 같은 디렉터리 안에 기본 파일명으로 캐시를 두는 설정
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            passwd: dir.join("passwd.cache"),
            group: dir.join("group.cache"),
            sshkey: dir.join("sshkey.cache"),
            mode: DEFAULT_CACHE_MODE,
        }
    }

    pub fn target(&self, kind: AccountKind) -> CacheTarget {
        let path = match kind {
            AccountKind::Users => &self.passwd,
            AccountKind::Groups => &self.group,
            AccountKind::SshKeys => &self.sshkey,
        };
        CacheTarget::new(path.clone(), self.mode)
    }
}

/// 데몬 전체 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// 데이터 소스 종류 (필수)
    pub source: SourceKind,
    /// 워커 폴링 주기 (초)
    pub update_interval_secs: u64,
    /// 정상 종료 시 워커 대기 한도 (초, 0이면 무제한)
    pub shutdown_timeout_secs: u64,
    /// 상태 요약 로그 주기 (초, 0이면 비활성화)
    pub status_log_interval_secs: u64,
    /// 상태 HTTP 엔드포인트 주소 (예: "127.0.0.1:9100")
    #[serde(default)]
    pub status_addr: Option<SocketAddr>,
    #[serde(default)]
    pub gce_metadata: GceMetadataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl DaemonConfig {
    /// 파일과 환경변수에서 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = config::File::from(path.as_ref()).format(config::FileFormat::Toml);
        Self::build(file)
    }

    /// TOML 문자열에서 로드합니다 (환경변수 오버라이드 포함).
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::build(config::File::from_str(toml, config::FileFormat::Toml))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            // 기본값으로 시작
            .set_default("update_interval_secs", 300)?
            .set_default("shutdown_timeout_secs", 30)?
            .set_default("status_log_interval_secs", 600)?
            // 파일에서 로드
            .add_source(file)
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 값 검증.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.cache.mode > 0o7777 {
            return Err(ConfigError::Invalid(format!(
                "cache.mode {:o}는 유효한 권한 비트가 아닙니다",
                self.cache.mode
            )));
        }
        for kind in AccountKind::ALL {
            if self.cache.target(kind).path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{} 캐시 경로가 비어 있습니다",
                    kind
                )));
            }
        }
        if self.source == SourceKind::GceMetadata && self.gce_metadata.primary_gid.is_empty() {
            return Err(ConfigError::Invalid(
                "gce_metadata.primary_gid가 비어 있습니다".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// 종료 대기 한도. 0이면 `None` (무제한)
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        (self.shutdown_timeout_secs > 0).then(|| Duration::from_secs(self.shutdown_timeout_secs))
    }

    pub fn status_log_interval(&self) -> Option<Duration> {
        (self.status_log_interval_secs > 0)
            .then(|| Duration::from_secs(self.status_log_interval_secs))
    }

    /// 설정된 종류의 데이터 소스를 생성합니다.
    pub fn build_source(&self) -> Result<Arc<dyn DataSource>, ConfigError> {
        match self.source {
            SourceKind::GceMetadata => {
                let client = GceMetadataClient::new(self.gce_metadata.clone())
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                Ok(Arc::new(client))
            }
        }
    }
}
