//! # Treasury Core
//!
//! 트레저리 동기화 엔진의 핵심 타입을 제공합니다.
//!
//! 이 크레이트는 동기화 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 에포크 밀리초 타임스탬프 샘플
//! - 파생 지표 계산 (APY, TVL, 풀 평가액)
//! - 에러 분류 체계
//! - 표시 타임존 변환
//! - 로깅 인프라

pub mod error;
pub mod logging;
pub mod metrics;
pub mod time;
pub mod types;

pub use error::*;
pub use logging::*;
pub use metrics::*;
pub use time::*;
pub use types::*;
