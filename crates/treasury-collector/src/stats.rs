//! 동기화 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 동기화 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// 총 레코드 수
    pub total: usize,
    /// 새로 기록된 레코드 수
    pub written: usize,
    /// 중복 키로 건너뛴 레코드 수
    pub skipped: usize,
    /// 실패한 레코드 수
    pub failed: usize,
    /// 파생 지표를 계산할 수 없었던 횟수
    pub unavailable: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록률 계산 (%)
    pub fn written_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.written as f64 / self.total as f64) * 100.0
        }
    }

    /// 다른 통계를 합산
    pub fn merge(&mut self, other: &SyncStats) {
        self.total += other.total;
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.unavailable += other.unavailable;
        self.elapsed += other.elapsed;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            written = self.written,
            skipped = self.skipped,
            failed = self.failed,
            unavailable = self.unavailable,
            written_rate = format!("{:.1}%", self.written_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}
