//! 공통 값 타입.
//!
//! 모든 타임스탬프는 에포크 밀리초(`i64`)이며, 금액/비율은
//! [`rust_decimal::Decimal`]을 사용합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 에포크 밀리초 타임스탬프.
pub type TimestampMs = i64;

/// 하루를 밀리초로 환산한 값.
pub const MS_PER_DAY: i64 = 86_400_000;

/// 시계열 샘플 (타임스탬프 + 관측값).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 관측 시각 (에포크 밀리초)
    pub timestamp_ms: TimestampMs,
    /// 관측값
    pub value: Decimal,
}

impl Sample {
    /// 새 샘플 생성.
    pub fn new(timestamp_ms: TimestampMs, value: Decimal) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// 파생 지표 결과.
///
/// 데이터 부족으로 지표를 계산할 수 없으면 `Unavailable`입니다.
/// 0이나 에러로 대체하지 않습니다. 저장소에는 센티널 문자열
/// (`"unavailable"`)로 기록됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Derived {
    /// 계산된 값
    Value(Decimal),
    /// 계산 불가 (샘플 부족, 기준값 0 등)
    Unavailable,
}

/// 저장소에 기록되는 계산 불가 센티널.
pub const UNAVAILABLE_CELL: &str = "unavailable";

impl Derived {
    /// 값이 있는지 확인.
    pub fn is_available(&self) -> bool {
        matches!(self, Derived::Value(_))
    }

    /// 내부 값 반환 (없으면 None).
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Derived::Value(v) => Some(*v),
            Derived::Unavailable => None,
        }
    }

    /// 저장소 셀 문자열로 변환.
    pub fn to_cell(&self) -> String {
        match self {
            Derived::Value(v) => v.to_string(),
            Derived::Unavailable => UNAVAILABLE_CELL.to_string(),
        }
    }
}

impl fmt::Display for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derived::Value(v) => write!(f, "{}", v),
            Derived::Unavailable => write!(f, "{}", UNAVAILABLE_CELL),
        }
    }
}

impl From<Option<Decimal>> for Derived {
    fn from(opt: Option<Decimal>) -> Self {
        match opt {
            Some(v) => Derived::Value(v),
            None => Derived::Unavailable,
        }
    }
}
