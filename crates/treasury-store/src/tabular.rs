//! 표 형태 저장소 트레이트와 A1 표기 유틸리티.

use async_trait::async_trait;
use treasury_core::TreasuryResult;

/// 추가 전용 표 형태 저장소.
///
/// 구현체는 셀 단위 덮어쓰기만 제공하면 됩니다. 고유성 제약이나
/// 트랜잭션은 기대하지 않습니다.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// 워크시트 전체를 행 단위 그리드로 읽습니다.
    async fn read_all(&self, worksheet: &str) -> TreasuryResult<Vec<Vec<String>>>;

    /// 한 컬럼의 값 목록을 읽습니다 (1행부터, 빈 꼬리는 잘릴 수 있음).
    async fn col_values(&self, worksheet: &str, column: &str) -> TreasuryResult<Vec<String>>;

    /// A1 범위에 값을 씁니다. 범위 밖 컬럼은 건드리지 않습니다.
    async fn update_range(
        &self,
        worksheet: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> TreasuryResult<()>;
}

/// 컬럼 문자를 0 기반 인덱스로 변환 ("A" -> 0, "AA" -> 26).
pub fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() {
        return None;
    }

    let mut index = 0usize;
    for c in col.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        index = index * 26 + (c as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// 0 기반 인덱스를 컬럼 문자로 변환 (0 -> "A", 26 -> "AA").
pub fn index_to_col(mut index: usize) -> String {
    let mut col = String::new();
    loop {
        col.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    col
}

/// 컬럼 문자에 오프셋을 더합니다 ("A" + 3 -> "D").
pub fn offset_col(col: &str, offset: usize) -> Option<String> {
    Some(index_to_col(col_to_index(col)? + offset))
}

/// 셀 참조 파싱 ("D5" -> (컬럼 인덱스 3, 행 5)).
pub fn parse_cell(cell: &str) -> Option<(usize, usize)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let col = col_to_index(&cell[..split])?;
    let row: usize = cell[split..].parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}

/// A1 범위 파싱. 단일 셀은 같은 시작/끝으로 확장됩니다.
pub fn parse_range(range: &str) -> Option<((usize, usize), (usize, usize))> {
    match range.split_once(':') {
        Some((start, end)) => Some((parse_cell(start)?, parse_cell(end)?)),
        None => {
            let cell = parse_cell(range)?;
            Some((cell, cell))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_roundtrip() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("Z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(index_to_col(0), "A");
        assert_eq!(index_to_col(25), "Z");
        assert_eq!(index_to_col(26), "AA");
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);
    }

    #[test]
    fn test_offset_col() {
        assert_eq!(offset_col("A", 3).as_deref(), Some("D"));
        assert_eq!(offset_col("Y", 2).as_deref(), Some("AA"));
        assert_eq!(offset_col("A", 0).as_deref(), Some("A"));
    }

    #[test]
    fn test_parse_cell_and_range() {
        assert_eq!(parse_cell("D5"), Some((3, 5)));
        assert_eq!(parse_cell("AA12"), Some((26, 12)));
        assert_eq!(parse_cell("5"), None);
        assert_eq!(parse_cell("D0"), None);

        assert_eq!(parse_range("A2:D2"), Some(((0, 2), (3, 2))));
        assert_eq!(parse_range("F5"), Some(((5, 5), (5, 5))));
    }
}
