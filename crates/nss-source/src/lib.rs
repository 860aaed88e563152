//! 계정 데이터 소스.
//!
//! 워커가 계정 레코드를 가져오는 외부 데이터 소스를 추상화합니다:
//! - [`DataSource`] trait: 계정 유형별 조회 연산
//! - [`GceMetadataClient`]: GCE 메타데이터 서버 클라이언트
//! - [`StaticSource`]: 고정 레코드를 반환하는 인메모리 소스 (테스트/임베딩용)

pub mod error;
pub mod provider;
pub mod source;

pub use error::{Result, SourceError};
pub use provider::gce_metadata::{GceMetadataClient, GceMetadataConfig};
pub use provider::fixed::StaticSource;
pub use source::DataSource;
