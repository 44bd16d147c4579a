//! 에러 타입 정의.

use std::fmt;
use treasury_core::TreasuryError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 코어 동기화 에러
    Core(TreasuryError),
    /// 설정 에러
    Config(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(e) => write!(f, "Sync error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<TreasuryError> for CollectorError {
    fn from(err: TreasuryError) -> Self {
        Self::Core(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
