//! 중복 키 계층.
//!
//! 저장소 백엔드는 고유성 제약이 없으므로, 쓰기 전에 키 컬럼을
//! 스캔해 동일 키의 존재 여부를 확인하고, 첫 빈 행에만 추가합니다.
//! 키 컬럼은 작업 사이클당 한 번 읽어 캐시하며, 추가 후에는 로컬
//! 캐시 기준으로 다음 빈 행을 찾아 포인터를 전진시킵니다
//! (단일 작성자 가정).

use std::collections::HashSet;
use std::sync::Mutex;
use treasury_core::{TreasuryError, TreasuryResult};

use crate::tabular::{col_to_index, offset_col, TabularStore};

/// 한 행 쓰기를 구성하는 연속 구간.
///
/// 시작 컬럼부터 값 개수만큼의 셀만 덮어씁니다. 구간 사이의
/// 컬럼(예: 시트의 수식 컬럼)은 건드리지 않습니다.
#[derive(Debug, Clone)]
pub struct WriteSegment {
    /// 시작 컬럼 문자 ("A", "F" 등)
    pub start_col: String,
    /// 해당 구간에 쓸 값들
    pub values: Vec<String>,
}

impl WriteSegment {
    /// 새 구간 생성.
    pub fn new(start_col: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            start_col: start_col.into(),
            values,
        }
    }
}

/// 키 컬럼 스냅샷과 빈 행 포인터.
#[derive(Debug, Default)]
struct DedupCache {
    /// 헤더를 제외한 키 집합
    keys: HashSet<String>,
    /// 키 컬럼 값 (인덱스 + 1 = 행 번호)
    column: Vec<String>,
    /// 다음 추가 대상 행 (1 기반)
    next_row: usize,
    loaded: bool,
}

/// `from_row` 이후 처음으로 키 컬럼이 비어 있는 행 (1 기반, 헤더 제외).
fn first_empty_row(column: &[String], from_row: usize) -> usize {
    let mut row = from_row.max(2);
    while column.get(row - 1).is_some_and(|v| !v.trim().is_empty()) {
        row += 1;
    }
    row
}

/// 키 컬럼 스캔 기반 멱등 추가 계층.
pub struct DedupKeyStore<'a, S: TabularStore> {
    store: &'a S,
    worksheet: String,
    key_column: String,
    cache: Mutex<DedupCache>,
}

impl<'a, S: TabularStore> DedupKeyStore<'a, S> {
    /// 새 인스턴스 생성. 첫 조회 시점에 키 컬럼을 읽어 캐시합니다.
    pub fn new(store: &'a S, worksheet: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            store,
            worksheet: worksheet.into(),
            key_column: key_column.into(),
            cache: Mutex::new(DedupCache {
                next_row: 2,
                ..DedupCache::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DedupCache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn ensure_loaded(&self) -> TreasuryResult<()> {
        if self.lock().loaded {
            return Ok(());
        }

        let values = self
            .store
            .col_values(&self.worksheet, &self.key_column)
            .await?;

        let mut cache = self.lock();

        // 1행은 헤더로 간주하고 키 집합에서 제외
        cache.keys = values
            .iter()
            .skip(1)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        cache.next_row = first_empty_row(&values, 2);
        cache.column = values;
        cache.loaded = true;

        tracing::debug!(
            worksheet = %self.worksheet,
            keys = cache.keys.len(),
            next_row = cache.next_row,
            "키 컬럼 캐시 적재 완료"
        );
        Ok(())
    }

    /// 키가 이미 존재하는지 확인.
    pub async fn exists(&self, key: &str) -> TreasuryResult<bool> {
        self.ensure_loaded().await?;
        Ok(self.lock().keys.contains(key.trim()))
    }

    /// 첫 빈 행에 구간들을 쓰고 키를 캐시에 반영합니다.
    ///
    /// 호출 측에서 먼저 [`exists`](Self::exists)로 중복을 걸러야
    /// 합니다. 여기서는 검사 없이 추가만 수행합니다.
    ///
    /// 키 컬럼이 포함된 구간은 항상 마지막에 씁니다. 중간에 쓰기가
    /// 실패해도 키는 보이지 않으므로, 키 존재 = 완성된 행이 됩니다.
    /// 캐시는 모든 구간이 성공한 뒤에만 갱신되며, 빈 행 포인터는
    /// 캐시된 키 컬럼에서 다음으로 비어 있는 행으로 전진합니다
    /// (중간 빈 행을 재사용한 경우 기존 행을 건너뜀).
    pub async fn append(&self, key: &str, segments: &[WriteSegment]) -> TreasuryResult<usize> {
        self.ensure_loaded().await?;
        let row = self.lock().next_row;

        let key_col = col_to_index(&self.key_column)
            .ok_or_else(|| TreasuryError::Store(format!("잘못된 컬럼: {}", self.key_column)))?;

        let mut ordered: Vec<&WriteSegment> = Vec::with_capacity(segments.len());
        let mut key_segment: Option<&WriteSegment> = None;
        for segment in segments {
            if segment.values.is_empty() {
                continue;
            }
            let start = col_to_index(&segment.start_col).ok_or_else(|| {
                TreasuryError::Store(format!("잘못된 컬럼: {}", segment.start_col))
            })?;
            let covers_key = start <= key_col && key_col < start + segment.values.len();
            if covers_key && key_segment.is_none() {
                key_segment = Some(segment);
            } else {
                ordered.push(segment);
            }
        }
        if let Some(segment) = key_segment {
            ordered.push(segment);
        }

        for segment in ordered {
            let end_col = offset_col(&segment.start_col, segment.values.len() - 1)
                .ok_or_else(|| {
                    TreasuryError::Store(format!("잘못된 컬럼: {}", segment.start_col))
                })?;

            let range = if segment.values.len() == 1 {
                format!("{}{}", segment.start_col, row)
            } else {
                format!("{}{}:{}{}", segment.start_col, row, end_col, row)
            };

            self.store
                .update_range(&self.worksheet, &range, vec![segment.values.clone()])
                .await?;
        }

        let mut cache = self.lock();
        cache.keys.insert(key.trim().to_string());
        if cache.column.len() < row {
            cache.column.resize(row, String::new());
        }
        cache.column[row - 1] = key.trim().to_string();
        cache.next_row = first_empty_row(&cache.column, row + 1);

        tracing::info!(worksheet = %self.worksheet, key, row, "행 추가 완료");
        Ok(row)
    }

    /// 시트가 비어 있으면 선언된 컬럼에만 헤더를 씁니다.
    ///
    /// 이미 1행에 값이 있으면 아무것도 하지 않습니다.
    pub async fn ensure_header(&self, segments: &[WriteSegment]) -> TreasuryResult<()> {
        let first_row = self
            .store
            .read_all(&self.worksheet)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        if first_row.iter().any(|v| !v.trim().is_empty()) {
            return Ok(());
        }

        for segment in segments {
            if segment.values.is_empty() {
                continue;
            }
            let end_col = offset_col(&segment.start_col, segment.values.len() - 1)
                .ok_or_else(|| {
                    TreasuryError::Store(format!("잘못된 컬럼: {}", segment.start_col))
                })?;
            let range = format!("{}1:{}1", segment.start_col, end_col);
            self.store
                .update_range(&self.worksheet, &range, vec![segment.values.clone()])
                .await?;
        }

        tracing::info!(worksheet = %self.worksheet, "헤더 초기화 완료");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use async_trait::async_trait;

    fn seeded() -> InMemoryStore {
        InMemoryStore::new().with_sheet(
            "Trends",
            vec![
                vec!["Date", "Time", "Rate", "APY"],
                vec!["2024-01-01", "07:00:00", "0.01", "3.65"],
                vec!["2024-01-02", "07:00:00", "0.02", "7.30"],
            ],
        )
    }

    /// 특정 범위 접두사에 대한 쓰기만 실패하는 저장소.
    struct FlakyStore {
        inner: InMemoryStore,
        fail_prefix: &'static str,
    }

    #[async_trait]
    impl TabularStore for FlakyStore {
        async fn read_all(&self, worksheet: &str) -> TreasuryResult<Vec<Vec<String>>> {
            self.inner.read_all(worksheet).await
        }

        async fn col_values(&self, worksheet: &str, column: &str) -> TreasuryResult<Vec<String>> {
            self.inner.col_values(worksheet, column).await
        }

        async fn update_range(
            &self,
            worksheet: &str,
            range: &str,
            values: Vec<Vec<String>>,
        ) -> TreasuryResult<()> {
            if range.starts_with(self.fail_prefix) {
                return Err(TreasuryError::TransientIo(format!(
                    "쓰기 실패: {}",
                    range
                )));
            }
            self.inner.update_range(worksheet, range, values).await
        }
    }

    #[tokio::test]
    async fn test_exists_skips_header() {
        let store = seeded();
        let dedup = DedupKeyStore::new(&store, "Trends", "A");

        assert!(dedup.exists("2024-01-01").await.unwrap());
        assert!(dedup.exists("2024-01-02").await.unwrap());
        assert!(!dedup.exists("Date").await.unwrap());
        assert!(!dedup.exists("2024-01-03").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_at_first_empty_row() {
        let store = seeded();
        let dedup = DedupKeyStore::new(&store, "Trends", "A");

        let row = dedup
            .append(
                "2024-01-03",
                &[WriteSegment::new(
                    "A",
                    vec![
                        "2024-01-03".into(),
                        "07:00:00".into(),
                        "0.03".into(),
                        "10.95".into(),
                    ],
                )],
            )
            .await
            .unwrap();

        assert_eq!(row, 4);
        assert!(dedup.exists("2024-01-03").await.unwrap());
        assert_eq!(store.snapshot("Trends")[3][0], "2024-01-03");
    }

    #[tokio::test]
    async fn test_append_advances_pointer_locally() {
        let store = seeded();
        let dedup = DedupKeyStore::new(&store, "Trends", "A");

        let first = dedup
            .append("2024-01-03", &[WriteSegment::new("A", vec!["2024-01-03".into()])])
            .await
            .unwrap();
        let second = dedup
            .append("2024-01-04", &[WriteSegment::new("A", vec!["2024-01-04".into()])])
            .await
            .unwrap();

        assert_eq!(first, 4);
        assert_eq!(second, 5);
    }

    #[tokio::test]
    async fn test_append_split_segments_skip_formula_column() {
        let store = InMemoryStore::new().with_sheet(
            "Positions",
            vec![vec!["Date", "Label", "Chain", "Asset", "Formula", "Value"]],
        );
        let dedup = DedupKeyStore::new(&store, "Positions", "A");

        dedup
            .append(
                "2024-01-01",
                &[
                    WriteSegment::new(
                        "A",
                        vec![
                            "2024-01-01".into(),
                            "GS".into(),
                            "Ethereum".into(),
                            "USDS".into(),
                        ],
                    ),
                    WriteSegment::new("F", vec!["1234.56".into()]),
                ],
            )
            .await
            .unwrap();

        let grid = store.snapshot("Positions");
        assert_eq!(grid[1][3], "USDS");
        assert_eq!(grid[1][4], "");
        assert_eq!(grid[1][5], "1234.56");
    }

    #[tokio::test]
    async fn test_ensure_header_only_when_empty() {
        let store = InMemoryStore::new();
        let dedup = DedupKeyStore::new(&store, "Fresh", "A");

        let header = [WriteSegment::new(
            "A",
            vec!["Date".into(), "Time".into(), "Rate".into()],
        )];
        dedup.ensure_header(&header).await.unwrap();
        assert_eq!(store.snapshot("Fresh")[0][0], "Date");

        // 이미 헤더가 있으면 덮어쓰지 않음
        let seeded = seeded();
        let dedup = DedupKeyStore::new(&seeded, "Trends", "A");
        dedup
            .ensure_header(&[WriteSegment::new("A", vec!["Other".into()])])
            .await
            .unwrap();
        assert_eq!(seeded.snapshot("Trends")[0][0], "Date");
    }

    #[tokio::test]
    async fn test_gap_row_is_reused() {
        let store = InMemoryStore::new().with_sheet(
            "Trends",
            vec![
                vec!["Date"],
                vec!["2024-01-01"],
                vec![""],
                vec!["2024-01-03"],
            ],
        );
        let dedup = DedupKeyStore::new(&store, "Trends", "A");

        // 중간 빈 행이 첫 추가 대상
        let row = dedup
            .append("2024-01-04", &[WriteSegment::new("A", vec!["2024-01-04".into()])])
            .await
            .unwrap();
        assert_eq!(row, 3);
        // 빈 행 뒤의 기존 키도 캐시에는 남아 있어야 함
        assert!(dedup.exists("2024-01-03").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_after_gap_skips_occupied_rows() {
        let store = InMemoryStore::new().with_sheet(
            "Trends",
            vec![
                vec!["Date"],
                vec!["2024-01-01"],
                vec![""],
                vec!["2024-01-03"],
            ],
        );
        let dedup = DedupKeyStore::new(&store, "Trends", "A");

        let first = dedup
            .append("2024-01-04", &[WriteSegment::new("A", vec!["2024-01-04".into()])])
            .await
            .unwrap();
        let second = dedup
            .append("2024-01-05", &[WriteSegment::new("A", vec!["2024-01-05".into()])])
            .await
            .unwrap();

        // 중간 빈 행을 채운 뒤에는 기존 행을 건너뛰고 꼬리로 전진
        assert_eq!(first, 3);
        assert_eq!(second, 5);

        let grid = store.snapshot("Trends");
        assert_eq!(grid[2][0], "2024-01-04");
        assert_eq!(grid[3][0], "2024-01-03");
        assert_eq!(grid[4][0], "2024-01-05");
    }

    #[tokio::test]
    async fn test_failed_value_write_leaves_key_invisible() {
        let store = FlakyStore {
            inner: InMemoryStore::new().with_sheet(
                "Positions",
                vec![vec!["Date", "Label", "Chain", "Asset", "Formula", "Value"]],
            ),
            fail_prefix: "F",
        };
        let dedup = DedupKeyStore::new(&store, "Positions", "A");

        let err = dedup
            .append(
                "2024-01-01",
                &[
                    WriteSegment::new(
                        "A",
                        vec![
                            "2024-01-01".into(),
                            "GS".into(),
                            "Ethereum".into(),
                            "USDS".into(),
                        ],
                    ),
                    WriteSegment::new("F", vec!["1234.56".into()]),
                ],
            )
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        // 키 컬럼은 마지막에 쓰므로 실패한 행의 키는 보이지 않아야 함
        let fresh = DedupKeyStore::new(&store, "Positions", "A");
        assert!(!fresh.exists("2024-01-01").await.unwrap());
        // 헤더 외에는 아무 셀도 기록되지 않아야 함
        assert_eq!(store.inner.snapshot("Positions").len(), 1);
    }
}
