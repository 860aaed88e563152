//! 데이터 소스 추상화.

use async_trait::async_trait;
use nss_core::{AccountKind, AccountSet, Group, SshKey, User};

use crate::error::Result;

/// 계정 데이터 소스 trait.
///
/// 하나의 인스턴스를 모든 워커가 `Arc`로 공유하며 동시에 호출합니다.
/// 따라서 구현체는 동시 호출에 안전해야 합니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct LdapSource { conn: LdapPool }
///
/// #[async_trait]
/// impl DataSource for LdapSource {
///     fn name(&self) -> &str { "ldap" }
///     async fn fetch_users(&self) -> Result<Vec<User>> { /* ... */ }
///     async fn fetch_groups(&self) -> Result<Vec<Group>> { /* ... */ }
///     async fn fetch_ssh_keys(&self) -> Result<Vec<SshKey>> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 로그에 표시할 소스 이름
    fn name(&self) -> &str;

    /// passwd 레코드 조회.
    async fn fetch_users(&self) -> Result<Vec<User>>;

    /// group 레코드 조회.
    async fn fetch_groups(&self) -> Result<Vec<Group>>;

    /// SSH 공개키 조회.
    async fn fetch_ssh_keys(&self) -> Result<Vec<SshKey>>;

    /// 계정 유형에 맞는 조회 연산으로 분기합니다.
    async fn fetch(&self, kind: AccountKind) -> Result<AccountSet> {
        Ok(match kind {
            AccountKind::Users => AccountSet::Users(self.fetch_users().await?),
            AccountKind::Groups => AccountSet::Groups(self.fetch_groups().await?),
            AccountKind::SshKeys => AccountSet::SshKeys(self.fetch_ssh_keys().await?),
        })
    }
}
