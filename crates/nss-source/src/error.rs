//! 데이터 소스 에러 타입.

use thiserror::Error;

/// 데이터 소스 조회 에러.
#[derive(Debug, Error)]
pub enum SourceError {
    /// 연결 실패, 타임아웃, 본문 읽기 실패
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서버가 성공이 아닌 상태 코드를 반환
    #[error("HTTP {status} 응답 ({url}): {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// 클라이언트 생성 실패 등 설정 문제
    #[error("데이터 소스 설정 에러: {0}")]
    Config(String),

    /// 주입된 실패 (StaticSource)
    #[error("데이터 소스 에러: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
