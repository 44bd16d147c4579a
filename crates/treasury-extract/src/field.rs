//! 필드 종류와 검증 범위, 수치 파싱 유틸리티.

use rust_decimal::Decimal;

/// 추출 대상 필드 종류.
///
/// 종류마다 후보값이 통과해야 하는 검증 범위가 다릅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 단가: 0.01 초과 1,000,000 미만
    Price,
    /// 백분율: 0 이상 10,000 이하
    Percentage,
    /// 양수 금액/수량: 0 초과
    PositiveAmount,
}

impl FieldKind {
    /// 후보값이 검증 범위 안에 있는지 확인합니다.
    pub fn validate(&self, value: Decimal) -> bool {
        match self {
            FieldKind::Price => {
                value > Decimal::new(1, 2) && value < Decimal::from(1_000_000)
            }
            FieldKind::Percentage => {
                value >= Decimal::ZERO && value <= Decimal::from(10_000)
            }
            FieldKind::PositiveAmount => value > Decimal::ZERO,
        }
    }

    /// 로그/에러 메시지용 이름.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Price => "price",
            FieldKind::Percentage => "percentage",
            FieldKind::PositiveAmount => "positive_amount",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 수치 문자열 파싱 (쉼표 제거).
///
/// "1,234.56" -> 1234.56
pub fn parse_numeric(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    cleaned.parse().ok()
}

/// 접미 배수가 붙은 수치 파싱 (K/M/B -> 천/백만/십억).
///
/// "12.5M" -> 12500000, "3K" -> 3000, "1,234" -> 1234
pub fn parse_scaled(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let value = parse_numeric(text)?;

    let multiplier = match text.chars().last()?.to_ascii_uppercase() {
        'K' => Decimal::from(1_000),
        'M' => Decimal::from(1_000_000),
        'B' => Decimal::from(1_000_000_000),
        _ => Decimal::ONE,
    };

    Some(value * multiplier)
}
