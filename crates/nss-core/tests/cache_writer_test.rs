//! 렌더링 + 원자적 쓰기 통합 테스트

use std::fs;
use std::path::Path;

use nss_core::{AccountSet, CacheError, CacheTarget, CacheWriter, Group, SshKey, User};
use proptest::prelude::*;

fn temp_files(dir: &Path, file_name: &str) -> Vec<String> {
    let prefix = format!("{}-", file_name);
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(&prefix))
        .collect()
}

fn sample_sets() -> Vec<(&'static str, AccountSet)> {
    vec![
        (
            "passwd.cache",
            AccountSet::Users(vec![User {
                name: "alice".to_string(),
                password: "*".to_string(),
                uid: "1001".to_string(),
                gid: "100".to_string(),
                gecos: "alice".to_string(),
                home_dir: "/home/alice".to_string(),
                shell: "/bin/bash".to_string(),
            }]),
        ),
        (
            "group.cache",
            AccountSet::Groups(vec![Group {
                name: "devs".to_string(),
                password: "*".to_string(),
                gid: "500".to_string(),
                members: vec!["alice".to_string(), "bob".to_string()],
            }]),
        ),
        (
            "sshkey.cache",
            AccountSet::SshKeys(vec![SshKey {
                user_name: "alice".to_string(),
                public_key: "ssh-rsa AAAAB3NzaC1yc2E alice".to_string(),
            }]),
        ),
    ]
}

#[test]
fn test_render_write_read_back_is_identical() {
    let dir = tempfile::tempdir().unwrap();

    for (file_name, set) in sample_sets() {
        let target = CacheTarget::new(dir.path().join(file_name), 0o644);
        let rendered = set.render();

        CacheWriter::write_target(&target, rendered.as_bytes()).unwrap();

        let read_back = fs::read(&target.path).unwrap();
        assert_eq!(read_back, rendered.as_bytes(), "{} 내용 불일치", file_name);
        assert!(temp_files(dir.path(), file_name).is_empty());
    }
}

#[cfg(unix)]
#[test]
fn test_mode_is_set_explicitly() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwd.cache");

    CacheWriter::write(&path, b"root:*:0:0:root:/root:/bin/sh\n", 0o640).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o640);

    CacheWriter::write(&path, b"", 0o644).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o644);
}

#[test]
fn test_overwrite_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group.cache");

    CacheWriter::write(&path, b"old:*:1:a,b,c,d,e,f\n", 0o644).unwrap();
    CacheWriter::write(&path, b"new:*:2:\n", 0o644).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "new:*:2:\n");
}

#[test]
fn test_failed_rename_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    // 비어 있지 않은 디렉터리 위로는 rename할 수 없다
    let path = dir.path().join("sshkey.cache");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    let err = CacheWriter::write(&path, b"alice:key\n", 0o644).unwrap_err();

    assert!(matches!(err, CacheError::Io { .. }));
    assert!(temp_files(dir.path(), "sshkey.cache").is_empty());
    assert!(path.join("keep").exists());
}

proptest! {
    #[test]
    fn prop_one_line_per_ssh_key(names in proptest::collection::vec("[a-z][a-z0-9]{0,8}", 0..20)) {
        let keys: Vec<SshKey> = names
            .iter()
            .map(|name| SshKey {
                user_name: name.clone(),
                public_key: format!("ssh-ed25519 AAAA {}", name),
            })
            .collect();

        let rendered = AccountSet::SshKeys(keys.clone()).render();
        let lines: Vec<&str> = rendered.lines().collect();

        prop_assert_eq!(lines.len(), keys.len());
        for (line, key) in lines.iter().zip(&keys) {
            let (user, public_key) = line.split_once(':').unwrap();
            prop_assert_eq!(user, key.user_name.as_str());
            prop_assert_eq!(public_key, key.public_key.as_str());
        }
    }
}
