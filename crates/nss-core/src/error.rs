//! 캐시 쓰기 에러 타입.

use std::path::PathBuf;

use thiserror::Error;

/// 캐시 파일 쓰기 에러.
#[derive(Debug, Error)]
pub enum CacheError {
    /// 파일명 또는 상위 디렉터리를 알 수 없는 경로
    #[error("잘못된 캐시 경로: {0}")]
    InvalidPath(PathBuf),

    /// 임시 파일 생성, 권한 설정, 쓰기, 동기화, rename 중 발생한 I/O 에러
    #[error("캐시 파일 쓰기 실패 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
