//! 고정 레코드를 반환하는 인메모리 데이터 소스.
//!
//! 데몬을 다른 프로그램에 임베딩하거나 워커 동작을 테스트할 때 사용합니다.
//! 실행 중에 레코드를 바꾸거나 실패를 주입할 수 있습니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nss_core::{Group, SshKey, User};
use tokio::sync::RwLock;

use crate::error::{Result, SourceError};
use crate::source::DataSource;

#[derive(Debug, Default)]
struct Records {
    users: Vec<User>,
    groups: Vec<Group>,
    ssh_keys: Vec<SshKey>,
    failure: Option<String>,
    delay: Option<Duration>,
}

/// 인메모리 데이터 소스.
#[derive(Debug, Default)]
pub struct StaticSource {
    records: RwLock<Records>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(users: Vec<User>, groups: Vec<Group>, ssh_keys: Vec<SshKey>) -> Self {
        Self {
            records: RwLock::new(Records {
                users,
                groups,
                ssh_keys,
                ..Default::default()
            }),
            fetches: AtomicUsize::new(0),
        }
    }

    pub async fn set_users(&self, users: Vec<User>) {
        self.records.write().await.users = users;
    }

    pub async fn set_groups(&self, groups: Vec<Group>) {
        self.records.write().await.groups = groups;
    }

    pub async fn set_ssh_keys(&self, ssh_keys: Vec<SshKey>) {
        self.records.write().await.ssh_keys = ssh_keys;
    }

    /// 이후 모든 조회가 주어진 메시지로 실패하도록 합니다. `None`이면 해제
    pub async fn set_failure(&self, message: Option<&str>) {
        self.records.write().await.failure = message.map(str::to_string);
    }

    /// 조회마다 지연을 추가합니다 (조회 중 상태를 관찰하는 용도)
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.records.write().await.delay = delay;
    }

    /// 지금까지의 조회 횟수 (성공/실패 포함)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn read<T: Clone>(&self, select: impl FnOnce(&Records) -> &Vec<T>) -> Result<Vec<T>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = self.records.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let records = self.records.read().await;
        if let Some(message) = &records.failure {
            return Err(SourceError::Unavailable(message.clone()));
        }
        Ok(select(&*records).clone())
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.read(|records| &records.users).await
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        self.read(|records| &records.groups).await
    }

    async fn fetch_ssh_keys(&self) -> Result<Vec<SshKey>> {
        self.read(|records| &records.ssh_keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nss_core::{AccountKind, AccountSet};

    #[tokio::test]
    async fn test_fetch_dispatches_by_kind() {
        let source = StaticSource::new(
            vec![],
            vec![Group {
                name: "devs".to_string(),
                password: "*".to_string(),
                gid: "500".to_string(),
                members: vec!["alice".to_string()],
            }],
            vec![],
        );

        let set = source.fetch(AccountKind::Groups).await.unwrap();
        assert!(matches!(set, AccountSet::Groups(ref groups) if groups.len() == 1));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let source = StaticSource::default();
        source.set_failure(Some("boom")).await;

        let err = source.fetch_users().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(ref msg) if msg == "boom"));

        source.set_failure(None).await;
        assert!(source.fetch_users().await.unwrap().is_empty());
        assert_eq!(source.fetch_count(), 2);
    }
}
