//! 트레저리 데이터 동기화 러너.
//!
//! 이 crate는 외부 원천에서 주기적으로 데이터를 가져와 추가 전용
//! 시트와 이벤트 저장소에 멱등하게 반영하는 바이너리를 제공합니다:
//! - 볼트 일일 수익률 트렌드 (APY 파생 포함)
//! - 온체인 볼트 포지션 평가액
//! - 거래소 잔고 스냅샷
//! - 거래소 입출금 이벤트

pub mod config;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod retry;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use retry::{RetryOutcome, RetryPolicy};
pub use stats::SyncStats;
