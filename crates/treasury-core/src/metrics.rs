//! 파생 지표 계산 공통 로직.
//!
//! 수집된 시계열 샘플에서 APY, TVL, 풀 평가액을 계산합니다.
//! 계산에 필요한 데이터가 부족하면 [`Derived::Unavailable`]을 반환하며,
//! 0으로 대체하거나 에러를 내지 않습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Derived, Sample, MS_PER_DAY};

/// 조회 기간(lookback) 기반 연환산 수익률(APY) 계산.
///
/// 가장 최신 샘플을 기준으로, `최신 시각 - P일`에 가장 가까운 샘플을
/// 기준 샘플로 선택합니다 (앞뒤 무관, 같은 거리면 더 오래된 샘플).
/// 보유 기간이 P일보다 짧으면 P' = min(P, 보유 일수)로 줄여서 계산합니다.
///
/// ```text
/// APY = (최신값 - 기준값) / 기준값 × (365 / 경과일수) × 100
/// ```
///
/// # Arguments
///
/// * `samples` - 시계열 샘플 (정렬 불필요, 내부에서 정렬)
/// * `lookback_days` - 조회 기간 P (일)
///
/// # Returns
///
/// 연환산 수익률 (백분율). 샘플이 2개 미만이거나, 경과 시간이 0이거나,
/// 기준값이 0 이하이면 `Unavailable`.
///
/// # Examples
///
/// ```ignore
/// use treasury_core::{apy_over_lookback, Sample, MS_PER_DAY};
/// use rust_decimal_macros::dec;
///
/// let samples = vec![
///     Sample::new(0, dec!(1.00)),
///     Sample::new(60 * MS_PER_DAY, dec!(1.024)),
/// ];
/// let apy = apy_over_lookback(&samples, 60);
/// // (1.024 - 1.00) / 1.00 * (365/60) * 100 ≈ 14.6%
/// ```
pub fn apy_over_lookback(samples: &[Sample], lookback_days: u32) -> Derived {
    if samples.len() < 2 {
        return Derived::Unavailable;
    }

    let mut sorted: Vec<Sample> = samples.to_vec();
    sorted.sort_by_key(|s| s.timestamp_ms);

    let newest = sorted[sorted.len() - 1];
    let oldest = sorted[0];

    // P' = min(P, 보유 일수): 보유 기간이 짧으면 전체 구간으로 축소
    let lookback_ms = i64::from(lookback_days) * MS_PER_DAY;
    let span_ms = newest.timestamp_ms - oldest.timestamp_ms;
    let effective_ms = lookback_ms.min(span_ms);

    let target = newest.timestamp_ms - effective_ms;

    // 목표 시각에 가장 가까운 샘플 선택 (같은 거리면 더 오래된 샘플 유지)
    let mut reference = oldest;
    let mut best_distance = (oldest.timestamp_ms - target).abs();
    for sample in &sorted[1..sorted.len() - 1] {
        let distance = (sample.timestamp_ms - target).abs();
        if distance < best_distance {
            reference = *sample;
            best_distance = distance;
        }
    }

    let elapsed_ms = newest.timestamp_ms - reference.timestamp_ms;
    if elapsed_ms <= 0 || reference.value <= Decimal::ZERO {
        return Derived::Unavailable;
    }

    let elapsed_days = Decimal::from(elapsed_ms) / Decimal::from(MS_PER_DAY);
    let growth = (newest.value - reference.value) / reference.value;
    let apy = growth * (dec!(365) / elapsed_days) * dec!(100);

    Derived::Value(apy)
}

/// TVL 계산 (총 예치 가치).
///
/// 같은 수집 사이클에서 관측된 공급량과 가격의 곱입니다.
///
/// # Arguments
///
/// * `supply` - 토큰 공급량
/// * `price` - 토큰 단가
pub fn tvl(supply: Decimal, price: Decimal) -> Decimal {
    supply * price
}

/// 풀 평가액 계산.
///
/// 지분 × 지분 단가로 평가하되, 지분 단가를 알 수 없으면(0 이하)
/// 기록된 원금을 하한으로 사용합니다. 수동 오버라이드 값이 설정되어
/// 있으면 두 경우 모두에 우선합니다.
///
/// # Arguments
///
/// * `shares` - 보유 지분 수량
/// * `share_price` - 지분 단가 (조회 실패 시 0)
/// * `principal` - 투입 원금 (하한값)
/// * `manual_override` - 수동 오버라이드 평가액
///
/// # Examples
///
/// ```ignore
/// use treasury_core::pool_value;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(pool_value(dec!(100), dec!(2.5), dec!(1000), None), dec!(250));
/// assert_eq!(pool_value(dec!(100), dec!(0), dec!(1000), None), dec!(1000));
/// ```
pub fn pool_value(
    shares: Decimal,
    share_price: Decimal,
    principal: Decimal,
    manual_override: Option<Decimal>,
) -> Decimal {
    if let Some(value) = manual_override {
        return value;
    }

    if share_price > Decimal::ZERO {
        shares * share_price
    } else {
        principal
    }
}
