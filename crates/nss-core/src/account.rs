//! 계정 레코드 모델과 캐시 라인 렌더링.
//!
//! NSS 캐시 파일은 콜론(`:`)으로 구분된 한 줄당 한 레코드 형식입니다:
//! - **passwd**: `name:password:uid:gid:gecos:home_dir:shell`
//! - **group**: `name:password:gid:member1,member2`
//! - **sshkey**: `user_name:public_key`
//!
//! # 구분자 처리
//!
//! 필드 값에 포함된 `:` 또는 줄바꿈은 이스케이프하지 않습니다.
//! 이런 값은 해당 라인을 깨뜨리며, 값 검증은 데이터 소스의 책임입니다.
//! NSS 캐시 형식 자체에 이스케이프 규칙이 없기 때문에 렌더러는 값을 그대로 씁니다.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// passwd 데이터베이스 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    /// 비밀번호 자리표시자 (보통 `*`)
    pub password: String,
    pub uid: String,
    pub gid: String,
    pub gecos: String,
    pub home_dir: String,
    pub shell: String,
}

/// group 데이터베이스 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// 비밀번호 자리표시자 (보통 `*`)
    pub password: String,
    pub gid: String,
    /// 멤버 사용자 이름 (알려진 사용자인지 검증하지 않음)
    pub members: Vec<String>,
}

/// 사용자 이름과 SSH 공개키의 바인딩.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub user_name: String,
    pub public_key: String,
}

/// 계정 유형. 워커 하나가 유형 하나를 담당합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Users,
    Groups,
    SshKeys,
}

impl AccountKind {
    /// 모든 계정 유형 (워커 생성 순서)
    pub const ALL: [AccountKind; 3] = [Self::Users, Self::Groups, Self::SshKeys];

    /// 워커 이름으로 쓰이는 문자열
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::SshKeys => "sshkeys",
        }
    }

    /// 기본 캐시 파일 경로
    pub fn default_cache_path(&self) -> &'static str {
        match self {
            Self::Users => "/etc/passwd.cache",
            Self::Groups => "/etc/group.cache",
            Self::SshKeys => "/etc/sshkey.cache",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "users" => Ok(Self::Users),
            "groups" => Ok(Self::Groups),
            "sshkeys" => Ok(Self::SshKeys),
            _ => Err(format!("Unknown account kind: {}", s)),
        }
    }
}

/// 한 번의 수집 사이클에서 가져온 단일 유형의 레코드 집합.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSet {
    Users(Vec<User>),
    Groups(Vec<Group>),
    SshKeys(Vec<SshKey>),
}

impl AccountSet {
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Users(_) => AccountKind::Users,
            Self::Groups(_) => AccountKind::Groups,
            Self::SshKeys(_) => AccountKind::SshKeys,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Users(users) => users.len(),
            Self::Groups(groups) => groups.len(),
            Self::SshKeys(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 캐시 파일 내용으로 렌더링합니다. 부수 효과가 없습니다.
    pub fn render(&self) -> String {
        match self {
            Self::Users(users) => render_users(users),
            Self::Groups(groups) => render_groups(groups),
            Self::SshKeys(keys) => render_ssh_keys(keys),
        }
    }
}

/// passwd 캐시 내용 렌더링.
///
/// 필드 안의 `:`는 이스케이프되지 않습니다 (모듈 문서 참고).
pub fn render_users(users: &[User]) -> String {
    let mut out = String::new();
    for user in users {
        // String에 대한 write!는 실패하지 않음
        let _ = writeln!(
            out,
            "{}:{}:{}:{}:{}:{}:{}",
            user.name, user.password, user.uid, user.gid, user.gecos, user.home_dir, user.shell
        );
    }
    out
}

/// group 캐시 내용 렌더링.
///
/// 멤버는 `,`로 연결되며 멤버 이름 안의 `,`나 `:`는 이스케이프되지 않습니다.
pub fn render_groups(groups: &[Group]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(
            out,
            "{}:{}:{}:{}",
            group.name,
            group.password,
            group.gid,
            group.members.join(",")
        );
    }
    out
}

/// sshkey 캐시 내용 렌더링.
pub fn render_ssh_keys(keys: &[SshKey]) -> String {
    let mut out = String::new();
    for key in keys {
        let _ = writeln!(out, "{}:{}", key.user_name, key.public_key);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_render_users_in_input_order() {
        let set = AccountSet::Users(vec![user("alice", "1001"), user("bob", "1002")]);

        assert_eq!(
            set.render(),
            "alice:*:1001:100:alice:/home/alice:/bin/bash\n\
             bob:*:1002:100:bob:/home/bob:/bin/bash\n"
        );
        assert_eq!(set.kind(), AccountKind::Users);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_render_group_members() {
        let set = AccountSet::Groups(vec![
            Group {
                name: "devs".to_string(),
                password: "*".to_string(),
                gid: "500".to_string(),
                members: vec!["alice".to_string(), "bob".to_string()],
            },
            Group {
                name: "empty".to_string(),
                password: "*".to_string(),
                gid: "501".to_string(),
                members: vec![],
            },
        ]);

        assert_eq!(set.render(), "devs:*:500:alice,bob\nempty:*:501:\n");
    }

    #[test]
    fn test_render_ssh_keys() {
        let set = AccountSet::SshKeys(vec![SshKey {
            user_name: "alice".to_string(),
            public_key: "ssh-ed25519 AAAAC3Nza alice@laptop".to_string(),
        }]);

        assert_eq!(set.render(), "alice:ssh-ed25519 AAAAC3Nza alice@laptop\n");
    }

    #[test]
    fn test_render_empty_set() {
        let set = AccountSet::SshKeys(vec![]);
        assert!(set.is_empty());
        assert_eq!(set.render(), "");
    }

    #[test]
    fn test_delimiter_in_field_is_not_escaped() {
        // 구분자가 포함된 값은 그대로 기록되어 필드 수가 늘어난다
        let mut bad = user("eve", "1003");
        bad.gecos = "Eve: Admin".to_string();

        let line = render_users(&[bad]);
        assert_eq!(line.trim_end().split(':').count(), 8);
    }

    #[test]
    fn test_account_kind_names() {
        assert_eq!(AccountKind::Users.name(), "users");
        assert_eq!(AccountKind::Groups.to_string(), "groups");
        assert_eq!("SSHKEYS".parse::<AccountKind>().unwrap(), AccountKind::SshKeys);
        assert!("hosts".parse::<AccountKind>().is_err());
        assert_eq!(AccountKind::SshKeys.default_cache_path(), "/etc/sshkey.cache");
    }
}
