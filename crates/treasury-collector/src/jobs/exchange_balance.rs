//! 거래소 잔고 스냅샷 동기화.
//!
//! 하루 한 행으로 거래소별 잔고 합계를 기록합니다. 조회에 실패한
//! 원천은 `unavailable` 셀로 남기고 나머지는 그대로 기록합니다.

use crate::orchestrator::{sync_rows, DedupKeyKind, RowRecord, SheetJobSpec};
use crate::{CollectorConfig, Result, RetryPolicy, SyncStats};
use rust_decimal::Decimal;
use std::time::Instant;
use treasury_core::{now_ms, to_zone_parts, Derived, TreasuryError};
use treasury_sources::{BinanceReader, BtseReader};
use treasury_store::{TabularStore, WriteSegment};

/// 거래소 잔고 합계를 하루 한 행으로 기록합니다.
pub async fn sync_exchange_balances<S: TabularStore>(
    store: &S,
    binance: Option<&BinanceReader>,
    btse: Option<&BtseReader>,
    config: &CollectorConfig,
) -> Result<SyncStats> {
    let start = Instant::now();
    let mut stats = SyncStats::new();

    let Some((date, time)) = to_zone_parts(now_ms(), config.display_tz) else {
        return Err(TreasuryError::Validation("현재 시각 변환 실패".to_string()).into());
    };

    let binance_earn = binance_earn_total(binance, &mut stats).await;
    let (btse_wallet, btse_earn) = btse_totals(btse, &mut stats).await;

    let record = RowRecord::new(
        date.clone(),
        vec![WriteSegment::new(
            "A",
            vec![
                date,
                time,
                binance_earn.to_cell(),
                btse_wallet.to_cell(),
                btse_earn.to_cell(),
            ],
        )],
    );

    let spec = SheetJobSpec {
        name: "exchange-balance",
        worksheet: config.exchange.balance_worksheet.clone(),
        key_column: "A",
        dedup: DedupKeyKind::DateOnly,
        header: vec![WriteSegment::new(
            "A",
            vec![
                "Date".into(),
                "Time".into(),
                "BinanceEarn".into(),
                "BtseWallet".into(),
                "BtseEarn".into(),
            ],
        )],
        write_delay: config.request_delay(),
        write_retry: RetryPolicy::default(),
    };

    sync_rows(store, &spec, vec![record], &mut stats).await?;
    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// Binance 유연 예치 포지션 합계.
async fn binance_earn_total(binance: Option<&BinanceReader>, stats: &mut SyncStats) -> Derived {
    let Some(reader) = binance else {
        stats.unavailable += 1;
        return Derived::Unavailable;
    };

    let policy = RetryPolicy::default();
    match policy
        .run("유연 예치 포지션 조회", || reader.flexible_positions())
        .await
        .into_result()
    {
        Ok(positions) => {
            let total = positions
                .iter()
                .filter_map(|p| p.total_amount.parse::<Decimal>().ok())
                .sum::<Decimal>();
            Derived::Value(total.round_dp(8).normalize())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Binance 예치 잔고 조회 실패");
            stats.unavailable += 1;
            Derived::Unavailable
        }
    }
}

/// BTSE 지갑 합계와 earn 포지션 합계.
async fn btse_totals(btse: Option<&BtseReader>, stats: &mut SyncStats) -> (Derived, Derived) {
    let Some(reader) = btse else {
        stats.unavailable += 2;
        return (Derived::Unavailable, Derived::Unavailable);
    };

    let policy = RetryPolicy::default();

    let wallet = match policy
        .run("BTSE 지갑 조회", || reader.wallet_balances())
        .await
        .into_result()
    {
        Ok(balances) => {
            let total = balances
                .iter()
                .filter_map(|b| b.total_value)
                .sum::<Decimal>();
            Derived::Value(total.round_dp(8).normalize())
        }
        Err(err) => {
            tracing::warn!(error = %err, "BTSE 지갑 조회 실패");
            stats.unavailable += 1;
            Derived::Unavailable
        }
    };

    let earn = match policy
        .run("BTSE earn 포지션 조회", || reader.earn_positions())
        .await
        .into_result()
    {
        Ok(positions) => {
            let total = positions
                .iter()
                .filter_map(|p| p.amount)
                .sum::<Decimal>();
            Derived::Value(total.round_dp(8).normalize())
        }
        Err(err) => {
            tracing::warn!(error = %err, "BTSE earn 조회 실패");
            stats.unavailable += 1;
            Derived::Unavailable
        }
    };

    (wallet, earn)
}
