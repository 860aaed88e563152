//! 원자적 캐시 파일 쓰기.
//!
//! 캐시 파일은 NSS 조회 계층이 언제든 읽을 수 있으므로, 읽는 쪽이
//! 잘리거나 일부만 쓰인 파일을 보는 일이 없어야 합니다.
//!
//! # 쓰기 순서
//!
//! 1. 대상과 같은 디렉터리에 `<파일명>-XXXXXX` 임시 파일 생성 (같은 파일시스템이므로 rename이 원자적)
//! 2. 권한 비트를 명시적으로 설정 (umask에 의존하지 않음)
//! 3. 전체 내용 쓰기
//! 4. `fsync`로 디스크에 반영
//! 5. 핸들 닫기
//! 6. 대상 경로로 rename
//!
//! 임시 파일 생성 이후 어느 단계에서든 실패하면 에러를 반환하기 전에
//! 임시 파일이 삭제됩니다. 기존 캐시 파일은 그대로 남습니다.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::account::AccountKind;
use crate::error::{CacheError, Result};

/// 캐시 파일 기본 권한 (`0644`)
pub const DEFAULT_CACHE_MODE: u32 = 0o644;

/// 캐시 파일 대상 (경로 + 권한).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTarget {
    pub path: PathBuf,
    pub mode: u32,
}

impl CacheTarget {
    pub fn new(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// 계정 유형별 기본 경로와 기본 권한으로 생성합니다.
    pub fn default_for(kind: AccountKind) -> Self {
        Self::new(kind.default_cache_path(), DEFAULT_CACHE_MODE)
    }
}

/// 원자적 캐시 파일 작성기.
///
/// 레코드 형식과 무관하며, 렌더링된 바이트만 받습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheWriter;

impl CacheWriter {
    /// `contents`를 `path`에 원자적으로 씁니다.
    ///
    /// # Errors
    ///
    /// - `CacheError::InvalidPath`: 파일명이 없는 경로 (예: `/`)
    /// - `CacheError::Io`: 임시 파일 생성/권한/쓰기/fsync/rename 실패
    pub fn write(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| CacheError::InvalidPath(path.to_path_buf()))?;
        let dir = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => return Err(CacheError::InvalidPath(path.to_path_buf())),
        };

        let mut prefix = OsString::from(file_name);
        prefix.push("-");

        // 이 시점 이후 실패하면 NamedTempFile/TempPath drop 시 임시 파일이 삭제된다
        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(|e| CacheError::io(path, e))?;

        set_mode(tmp.as_file(), mode).map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.write_all(contents)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(tmp.path(), e))?;

        // 핸들을 닫고 경로만 유지
        let tmp_path = tmp.into_temp_path();
        tmp_path
            .persist(path)
            .map_err(|e| CacheError::io(path, e.error))?;

        tracing::debug!(
            path = %path.display(),
            bytes = contents.len(),
            mode = %format_args!("{:o}", mode),
            "캐시 파일 교체 완료"
        );
        Ok(())
    }

    /// 대상 설정으로 씁니다.
    pub fn write_target(target: &CacheTarget, contents: &[u8]) -> Result<()> {
        Self::write(&target.path, contents, target.mode)
    }
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
