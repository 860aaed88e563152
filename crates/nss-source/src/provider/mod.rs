//! 데이터 소스 구현체.

pub mod fixed;
pub mod gce_metadata;
