//! 동기화 엔진의 에러 타입.
//!
//! 이 모듈은 동기화 파이프라인 전반에서 사용되는 에러 분류를 정의합니다.
//! 파생 지표의 "unavailable"은 에러가 아니라 값이므로 여기에 포함되지 않습니다
//! ([`crate::types::Derived`] 참고).

use thiserror::Error;

/// 핵심 동기화 에러.
#[derive(Debug, Error)]
pub enum TreasuryError {
    /// 설정 에러 (치명적, fetch 이전에 감지)
    #[error("설정 에러: {0}")]
    Config(String),

    /// 추출 실패 (모든 전략 소진)
    #[error("추출 에러: {0}")]
    Extraction(String),

    /// 검증 실패 (필드 범위 위반)
    #[error("검증 에러: {0}")]
    Validation(String),

    /// 일시적 I/O 에러 (재시도 대상)
    #[error("일시적 I/O 에러: {0}")]
    TransientIo(String),

    /// 저장소 프로토콜 에러 (잘못된 범위, 워크시트 없음 등)
    #[error("저장소 에러: {0}")]
    Store(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 동기화 작업을 위한 Result 타입.
pub type TreasuryResult<T> = Result<T, TreasuryError>;

impl TreasuryError {
    /// 일시적 I/O 에러를 생성합니다.
    pub fn transient(err: impl std::fmt::Display) -> Self {
        TreasuryError::TransientIo(err.to_string())
    }

    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreasuryError::TransientIo(_))
    }

    /// 치명적인 에러인지 확인합니다 (작업 즉시 중단).
    pub fn is_fatal(&self) -> bool {
        matches!(self, TreasuryError::Config(_))
    }
}

impl From<serde_json::Error> for TreasuryError {
    fn from(err: serde_json::Error) -> Self {
        TreasuryError::Serialization(err.to_string())
    }
}
