//! 인메모리 표 저장소 (테스트 더블).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use treasury_core::{TreasuryError, TreasuryResult};

use crate::tabular::{col_to_index, parse_range, TabularStore};

/// 인메모리 `TabularStore` 구현.
///
/// 워크시트별 2차원 그리드를 그대로 들고 있으며, 범위 쓰기는
/// 필요한 만큼 그리드를 늘립니다.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemoryStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 그리드가 채워진 워크시트 생성 (테스트 준비용).
    pub fn with_sheet(self, worksheet: &str, rows: Vec<Vec<&str>>) -> Self {
        {
            let mut sheets = self.sheets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            sheets.insert(
                worksheet.to_string(),
                rows.into_iter()
                    .map(|row| row.into_iter().map(String::from).collect())
                    .collect(),
            );
        }
        self
    }

    /// 현재 그리드 스냅샷 (검증용).
    pub fn snapshot(&self, worksheet: &str) -> Vec<Vec<String>> {
        self.sheets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(worksheet)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TabularStore for InMemoryStore {
    async fn read_all(&self, worksheet: &str) -> TreasuryResult<Vec<Vec<String>>> {
        Ok(self.snapshot(worksheet))
    }

    async fn col_values(&self, worksheet: &str, column: &str) -> TreasuryResult<Vec<String>> {
        let col = col_to_index(column)
            .ok_or_else(|| TreasuryError::Store(format!("잘못된 컬럼: {}", column)))?;

        let grid = self.snapshot(worksheet);
        let mut values: Vec<String> = grid
            .iter()
            .map(|row| row.get(col).cloned().unwrap_or_default())
            .collect();

        // 실제 백엔드처럼 빈 꼬리는 잘라서 반환
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn update_range(
        &self,
        worksheet: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> TreasuryResult<()> {
        let ((start_col, start_row), (end_col, end_row)) = parse_range(range)
            .ok_or_else(|| TreasuryError::Store(format!("잘못된 범위: {}", range)))?;

        if start_col > end_col || start_row > end_row {
            return Err(TreasuryError::Store(format!("뒤집힌 범위: {}", range)));
        }

        let mut sheets = self.sheets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let grid = sheets.entry(worksheet.to_string()).or_default();

        for (row_offset, row_values) in values.iter().enumerate() {
            let row_index = start_row - 1 + row_offset;
            if row_index + 1 > end_row {
                break;
            }

            while grid.len() <= row_index {
                grid.push(Vec::new());
            }
            let row = &mut grid[row_index];

            for (col_offset, value) in row_values.iter().enumerate() {
                let col_index = start_col + col_offset;
                if col_index > end_col {
                    break;
                }
                while row.len() <= col_index {
                    row.push(String::new());
                }
                row[col_index] = value.clone();
            }
        }

        Ok(())
    }
}
