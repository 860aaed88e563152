//! GCE 메타데이터 서버 클라이언트.
//!
//! 인스턴스(또는 프로젝트) 커스텀 메타데이터 속성에 저장된 계정 목록을 읽습니다.
//!
//! # 메타데이터 값 형식
//!
//! - 사용자 키 (`user_key`): 한 줄에 `USERNAME:UID[:PUBKEY]`
//! - 그룹 키 (`group_key`): 한 줄에 `GROUPNAME:GID:MEMBER1,MEMBER2`
//!
//! SSH 공개키는 사용자 키의 세 번째 필드에서 가져옵니다.
//! 필드 수가 모자란 줄은 조용히 건너뜁니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let client = GceMetadataClient::new(GceMetadataConfig::default())?;
//! let users = client.fetch_users().await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use nss_core::{Group, SshKey, User};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};
use crate::source::DataSource;

/// 메타데이터 서버 기본 주소
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1/";

/// 메타데이터 서버 주소를 덮어쓰는 환경변수 (host[:port])
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

const PASSWORD_PLACEHOLDER: &str = "*";
const LOGIN_SHELL: &str = "/bin/bash";

/// GCE 메타데이터 소스 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GceMetadataConfig {
    /// 메타데이터 API 기본 URL. 비어 있으면 `GCE_METADATA_HOST` 또는 기본값 사용
    pub base_url: Option<String>,
    /// 키 접두사 (예: "instance/attributes/")
    pub key_prefix: String,
    /// 사용자 목록 키
    pub user_key: String,
    /// 그룹 목록 키
    pub group_key: String,
    /// 모든 사용자에게 부여할 기본 GID
    pub primary_gid: String,
    /// 홈 디렉터리 상위 경로
    pub home_dir_base: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for GceMetadataConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            key_prefix: "instance/attributes/".to_string(),
            user_key: "nss-users".to_string(),
            group_key: "nss-groups".to_string(),
            primary_gid: "100".to_string(),
            home_dir_base: "/home".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl GceMetadataConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 실제 요청에 사용할 기본 URL (항상 `/`로 끝남)
    pub fn resolved_base_url(&self) -> String {
        let url = match &self.base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => match std::env::var(METADATA_HOST_ENV) {
                Ok(host) if !host.is_empty() => format!("http://{}/computeMetadata/v1/", host),
                _ => DEFAULT_METADATA_URL.to_string(),
            },
        };

        if url.ends_with('/') {
            url
        } else {
            format!("{}/", url)
        }
    }
}

/// GCE 메타데이터 서버 클라이언트.
///
/// `reqwest::Client`는 내부적으로 커넥션 풀을 공유하므로 워커들이 동시에 호출해도 안전합니다.
#[derive(Debug, Clone)]
pub struct GceMetadataClient {
    client: reqwest::Client,
    base_url: String,
    config: GceMetadataConfig,
}

impl GceMetadataClient {
    pub fn new(config: GceMetadataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        let base_url = config.resolved_base_url();
        tracing::debug!(base_url = %base_url, "GCE 메타데이터 클라이언트 생성");

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &GceMetadataConfig {
        &self.config
    }

    /// 메타데이터 값 하나를 조회합니다.
    async fn get(&self, key: &str) -> Result<String> {
        let url = format!("{}{}{}", self.base_url, self.config.key_prefix, key);

        tracing::debug!(url = %url, "메타데이터 요청");

        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl DataSource for GceMetadataClient {
    fn name(&self) -> &str {
        "gce_metadata"
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        let value = self.get(&self.config.user_key).await?;
        Ok(parse_users(&value, &self.config))
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let value = self.get(&self.config.group_key).await?;
        Ok(parse_groups(&value))
    }

    async fn fetch_ssh_keys(&self) -> Result<Vec<SshKey>> {
        // 공개키는 사용자 목록과 같은 키에 저장됨
        let value = self.get(&self.config.user_key).await?;
        Ok(parse_ssh_keys(&value))
    }
}

/// `USERNAME:UID[:PUBKEY]` 줄을 사용자 레코드로 변환합니다.
pub fn parse_users(value: &str, config: &GceMetadataConfig) -> Vec<User> {
    value
        .split('\n')
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 2 {
                return None;
            }
            let name = fields[0];
            Some(User {
                name: name.to_string(),
                password: PASSWORD_PLACEHOLDER.to_string(),
                uid: fields[1].to_string(),
                gid: config.primary_gid.clone(),
                gecos: name.to_string(),
                home_dir: format!("{}/{}", config.home_dir_base, name),
                shell: LOGIN_SHELL.to_string(),
            })
        })
        .collect()
}

/// `GROUPNAME:GID:MEMBERS` 줄을 그룹 레코드로 변환합니다.
pub fn parse_groups(value: &str) -> Vec<Group> {
    value
        .split('\n')
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 3 {
                return None;
            }
            Some(Group {
                name: fields[0].to_string(),
                password: PASSWORD_PLACEHOLDER.to_string(),
                gid: fields[1].to_string(),
                members: fields[2]
                    .split(',')
                    .filter(|member| !member.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// 사용자 목록에서 세 번째 필드(공개키)가 있는 줄만 골라냅니다.
pub fn parse_ssh_keys(value: &str) -> Vec<SshKey> {
    // TODO: 사용자 이름 기준 ACL (허용된 사용자만 키 등록)
    value
        .split('\n')
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 3 {
                return None;
            }
            Some(SshKey {
                user_name: fields[0].to_string(),
                public_key: fields[2].to_string(),
            })
        })
        .collect()
}
