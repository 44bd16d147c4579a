//! 페이지 본문에서 토큰 컨트랙트 주소 탐색.

use regex::Regex;

/// EVM 주소 패턴 (0x + 40 hex).
const ADDRESS_PATTERN: &str = r"0x[a-fA-F0-9]{40}";

/// 본문에서 자산의 컨트랙트 주소를 찾습니다.
///
/// 주소 후보 주변 텍스트(앞 50자, 뒤 90자)에 자산 심볼이나
/// contract/token/address 키워드가 있는 후보를 우선하고, 없으면
/// 첫 번째 후보를 반환합니다.
pub fn find_contract_address(body: &str, symbol: &str) -> Option<String> {
    let re = Regex::new(ADDRESS_PATTERN).ok()?;
    let symbol_lower = symbol.to_lowercase();

    let mut first: Option<&str> = None;
    for m in re.find_iter(body) {
        if first.is_none() {
            first = Some(m.as_str());
        }

        let start = m.start().saturating_sub(50);
        let end = (m.end() + 90).min(body.len());
        // 멀티바이트 경계 보정
        let start = floor_char_boundary(body, start);
        let end = floor_char_boundary(body, end);
        let context = body[start..end].to_lowercase();

        if context.contains(&symbol_lower)
            || context.contains("contract")
            || context.contains("token")
            || context.contains("address")
        {
            tracing::debug!(address = m.as_str(), symbol, "컨텍스트 일치 주소 발견");
            return Some(m.as_str().to_string());
        }
    }

    first.map(|s| s.to_string())
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
