//! 볼트 일일 수익률 트렌드 동기화.

use crate::orchestrator::{sync_rows, DedupKeyKind, RowRecord, SheetJobSpec};
use crate::{CollectorConfig, Result, RetryPolicy, SyncStats};
use rust_decimal::Decimal;
use std::time::Instant;
use treasury_core::{to_zone_parts, Derived, Sample, TimestampMs};
use treasury_extract::FieldKind;
use treasury_sources::{RestSource, TrendQuery};
use treasury_store::{TabularStore, WriteSegment};

/// 볼트 트렌드를 조회해 날짜 키로 시트에 추가합니다.
///
/// APY는 전체 샘플 구간에서 한 번 산출하며, 범위를 벗어난 값은
/// `unavailable`로 기록합니다.
pub async fn sync_vault_trend<S: TabularStore>(
    store: &S,
    config: &CollectorConfig,
) -> Result<SyncStats> {
    let start = Instant::now();
    let mut stats = SyncStats::new();
    let cfg = &config.vault_trend;

    tracing::info!(vault_id = cfg.vault_id, days = cfg.days, "볼트 트렌드 동기화 시작");

    let source = RestSource::new(&cfg.base_url, cfg.timeout_secs)?;
    let query = TrendQuery {
        vault_id: cfg.vault_id,
        days: cfg.days,
        ..Default::default()
    };

    let policy = RetryPolicy::default();
    let trends = policy
        .run("볼트 트렌드 조회", || source.fetch_vault_trends(&query))
        .await
        .into_result()?;

    // 문자열 레코드를 샘플로 변환. 파싱 불가 레코드는 실패로 집계
    let mut samples: Vec<Sample> = Vec::with_capacity(trends.len());
    for trend in &trends {
        let timestamp: std::result::Result<TimestampMs, _> = trend.snapshot_time.parse();
        let value: std::result::Result<Decimal, _> = trend.amount.parse();

        match (timestamp, value) {
            (Ok(timestamp_ms), Ok(value)) => samples.push(Sample {
                timestamp_ms,
                value,
            }),
            _ => {
                stats.total += 1;
                stats.failed += 1;
                tracing::warn!(
                    snapshot_time = %trend.snapshot_time,
                    amount = %trend.amount,
                    "트렌드 레코드 파싱 실패"
                );
            }
        }
    }

    let apy_cell = derive_apy_cell(&samples, cfg.lookback_days, &mut stats);

    let mut records = Vec::with_capacity(samples.len());
    for sample in &samples {
        let Some((date, time)) = to_zone_parts(sample.timestamp_ms, config.display_tz) else {
            stats.total += 1;
            stats.failed += 1;
            tracing::warn!(timestamp_ms = sample.timestamp_ms, "타임스탬프 변환 실패");
            continue;
        };

        records.push(RowRecord::new(
            date.clone(),
            vec![WriteSegment::new(
                "A",
                vec![date, time, sample.value.to_string(), apy_cell.clone()],
            )],
        ));
    }

    let spec = SheetJobSpec {
        name: "vault-trend",
        worksheet: cfg.worksheet.clone(),
        key_column: "A",
        dedup: DedupKeyKind::DateOnly,
        header: vec![WriteSegment::new(
            "A",
            vec![
                "Date".into(),
                "Time".into(),
                "DailyRate".into(),
                "APY(%)".into(),
            ],
        )],
        write_delay: config.request_delay(),
        write_retry: RetryPolicy::default(),
    };

    sync_rows(store, &spec, records, &mut stats).await?;
    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 샘플 구간에서 APY 셀 값을 산출합니다.
fn derive_apy_cell(samples: &[Sample], lookback_days: u32, stats: &mut SyncStats) -> String {
    let apy = treasury_core::apy_over_lookback(samples, lookback_days);

    match apy {
        Derived::Value(v) if FieldKind::Percentage.validate(v) => v.round_dp(4).to_string(),
        Derived::Value(v) => {
            tracing::warn!(apy = %v, "APY가 허용 범위를 벗어남");
            stats.unavailable += 1;
            Derived::Unavailable.to_cell()
        }
        Derived::Unavailable => {
            tracing::warn!("APY 산출 불가 (샘플 부족 또는 기준값 없음)");
            stats.unavailable += 1;
            Derived::Unavailable.to_cell()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_store::InMemoryStore;

    fn test_config(base_url: &str) -> CollectorConfig {
        let mut config = crate::test_support::test_config();
        config.vault_trend.base_url = base_url.to_string();
        config
    }

    #[tokio::test]
    async fn test_sync_writes_new_dates_and_skips_existing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/public/vault/vaultTrends")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                // 1704069000000 = 2024-01-01 07:30 GMT+7, 1704132000000 = 2024-01-02
                r#"{"code":"SUCCESS","data":{"list":[
                    {"snapshotTime":"1704069000000","amount":"1.00"},
                    {"snapshotTime":"1704132000000","amount":"1.02"}
                ]}}"#,
            )
            .create_async()
            .await;

        let store = InMemoryStore::new().with_sheet(
            "Trends",
            vec![
                vec!["Date", "Time", "DailyRate", "APY(%)"],
                vec!["2024-01-01", "07:30:00", "1.00", ""],
            ],
        );

        let stats = sync_vault_trend(&store, &test_config(&server.url()))
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.unavailable, 0);

        let grid = store.snapshot("Trends");
        assert_eq!(grid[2][0], "2024-01-02");
        // 성장률 2%, 경과 약 0.73일 -> 연환산 약 1002%
        let apy: Decimal = grid[2][3].parse().unwrap();
        assert!(apy > Decimal::from(900) && apy < Decimal::from(1100));
    }

    #[tokio::test]
    async fn test_single_sample_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/public/vault/vaultTrends")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"code":"SUCCESS","data":{"list":[
                    {"snapshotTime":"1704069000000","amount":"1.00"}
                ]}}"#,
            )
            .create_async()
            .await;

        let store = InMemoryStore::new();
        let stats = sync_vault_trend(&store, &test_config(&server.url()))
            .await
            .unwrap();

        assert_eq!(stats.unavailable, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(store.snapshot("Trends")[1][3], "unavailable");
    }

    #[tokio::test]
    async fn test_unparseable_record_counts_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/public/vault/vaultTrends")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"code":"SUCCESS","data":{"list":[
                    {"snapshotTime":"oops","amount":"1.00"},
                    {"snapshotTime":"1704069000000","amount":"1.00"},
                    {"snapshotTime":"1704132000000","amount":"1.02"}
                ]}}"#,
            )
            .create_async()
            .await;

        let store = InMemoryStore::new();
        let stats = sync_vault_trend(&store, &test_config(&server.url()))
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.total, 3);
    }
}
