//! 시트 작업 오케스트레이터.
//!
//! 모든 시트 작업은 같은 레코드 상태 기계를 거칩니다:
//! Fetched → Validated → KeyChecked → {Written | Skipped | Failed}.
//! 한 레코드의 실패는 기록만 하고 다음 레코드로 진행합니다.

use crate::{Result, RetryPolicy, SyncStats};
use std::fmt;
use std::time::Duration;
use treasury_core::TreasuryError;
use treasury_store::{DedupKeyStore, TabularStore, WriteSegment};

/// 중복 키 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKeyKind {
    /// 표시 타임존 기준 하루에 한 행
    DateOnly,
    /// 원천 이벤트 식별자당 한 레코드
    EventId,
}

impl fmt::Display for DedupKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateOnly => write!(f, "date-only"),
            Self::EventId => write!(f, "event-id"),
        }
    }
}

/// 레코드 처리 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Fetched,
    Validated,
    KeyChecked,
    Written,
    Skipped,
    Failed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetched => write!(f, "fetched"),
            Self::Validated => write!(f, "validated"),
            Self::KeyChecked => write!(f, "key-checked"),
            Self::Written => write!(f, "written"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 시트에 쓸 한 행 레코드.
#[derive(Debug, Clone)]
pub struct RowRecord {
    /// 중복 검사에 사용할 키 (키 컬럼에 그대로 기록되어야 함)
    pub key: String,
    /// 행을 구성하는 쓰기 구간들
    pub segments: Vec<WriteSegment>,
}

impl RowRecord {
    /// 새 레코드 생성.
    pub fn new(key: impl Into<String>, segments: Vec<WriteSegment>) -> Self {
        Self {
            key: key.into(),
            segments,
        }
    }
}

/// 시트 작업 명세.
pub struct SheetJobSpec {
    /// 작업 이름
    pub name: &'static str,
    /// 대상 워크시트
    pub worksheet: String,
    /// 중복 키 컬럼
    pub key_column: &'static str,
    /// 중복 키 단위
    pub dedup: DedupKeyKind,
    /// 빈 시트일 때 기록할 헤더
    pub header: Vec<WriteSegment>,
    /// 기록 사이 대기 시간 (저장소 호출 제한 대응)
    pub write_delay: Duration,
    /// 셀 쓰기 재시도 정책
    pub write_retry: RetryPolicy,
}

/// 레코드 목록을 상태 기계에 따라 시트에 반영합니다.
///
/// 저장소 접근 중 설정 에러가 나오면 작업 전체를 중단하고, 그 외
/// 에러는 해당 레코드만 Failed로 집계합니다.
pub async fn sync_rows<S: TabularStore>(
    store: &S,
    spec: &SheetJobSpec,
    records: Vec<RowRecord>,
    stats: &mut SyncStats,
) -> Result<()> {
    let dedup = DedupKeyStore::new(store, spec.worksheet.clone(), spec.key_column);

    if !spec.header.is_empty() {
        dedup.ensure_header(&spec.header).await?;
    }

    tracing::info!(
        job = spec.name,
        worksheet = %spec.worksheet,
        dedup = %spec.dedup,
        count = records.len(),
        "레코드 반영 시작"
    );

    for record in records {
        stats.total += 1;

        match sync_one(&dedup, &spec.write_retry, &record).await {
            Ok(RecordState::Written) => {
                stats.written += 1;
                if !spec.write_delay.is_zero() {
                    tokio::time::sleep(spec.write_delay).await;
                }
            }
            Ok(RecordState::Skipped) => {
                stats.skipped += 1;
                tracing::debug!(job = spec.name, key = %record.key, "중복 키, 건너뜀");
            }
            Ok(state) => {
                // sync_one은 Written/Skipped만 돌려줌
                tracing::warn!(job = spec.name, state = %state, "예상 밖 레코드 상태");
                stats.failed += 1;
            }
            Err(TreasuryError::Config(msg)) => {
                stats.failed += 1;
                return Err(crate::error::CollectorError::Core(TreasuryError::Config(
                    msg,
                )));
            }
            Err(err) => {
                stats.failed += 1;
                tracing::error!(job = spec.name, key = %record.key, error = %err, "레코드 반영 실패");
            }
        }
    }

    Ok(())
}

/// 한 레코드의 상태 전이를 수행합니다.
async fn sync_one<S: TabularStore>(
    dedup: &DedupKeyStore<'_, S>,
    policy: &RetryPolicy,
    record: &RowRecord,
) -> treasury_core::TreasuryResult<RecordState> {
    let mut state = RecordState::Fetched;
    tracing::trace!(key = %record.key, state = %state, "레코드 수신");

    if record.key.trim().is_empty() {
        return Err(TreasuryError::Validation("빈 중복 키".to_string()));
    }
    if record.segments.iter().all(|s| s.values.is_empty()) {
        return Err(TreasuryError::Validation("빈 쓰기 구간".to_string()));
    }
    state = RecordState::Validated;
    tracing::trace!(key = %record.key, state = %state, "검증 통과");

    if dedup.exists(&record.key).await? {
        return Ok(RecordState::Skipped);
    }
    state = RecordState::KeyChecked;
    tracing::trace!(key = %record.key, state = %state, "신규 키 확인");

    // 일시적인 저장소 오류로 행 하나를 잃지 않도록 쓰기도 재시도
    let row = policy
        .run("행 기록", || dedup.append(&record.key, &record.segments))
        .await
        .into_result()?;
    tracing::debug!(key = %record.key, row, "행 기록 완료");
    Ok(RecordState::Written)
}
