//! 거래소 입출금 이벤트 동기화.
//!
//! 입출금 이력을 (거래 ID, 종류) 복합 키로 멱등하게 이벤트
//! 저장소에 추가합니다. 완료 상태의 레코드만 대상입니다.

use crate::{CollectorConfig, Result, RetryPolicy, SyncStats};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Instant;
use treasury_core::to_zone_parts;
use treasury_sources::BinanceReader;
use treasury_store::{EventRecord, RtdbStore};

/// 입금 완료 상태 코드
const DEPOSIT_STATUS_SUCCESS: i32 = 1;
/// 출금 완료 상태 코드
const WITHDRAW_STATUS_COMPLETED: i32 = 6;

/// 시세 페어를 만들 수 없는 기축 자산
const STABLE_COINS: [&str; 3] = ["USDT", "USDC", "FDUSD"];

/// Binance 입출금 이력을 이벤트 저장소에 반영합니다.
pub async fn sync_exchange_flows(
    binance: &BinanceReader,
    events: &RtdbStore,
    config: &CollectorConfig,
) -> Result<SyncStats> {
    let start = Instant::now();
    let mut stats = SyncStats::new();
    let path = &config.exchange.rtdb_path;
    let policy = RetryPolicy::default();

    let deposits = policy
        .run("입금 이력 조회", || binance.deposit_history())
        .await
        .into_result()?;
    let withdrawals = policy
        .run("출금 이력 조회", || binance.withdraw_history())
        .await
        .into_result()?;

    // 기존 이벤트 키는 사이클당 한 번만 읽어 캐시
    let mut seen = policy
        .run("이벤트 키 조회", || events.event_keys(path))
        .await
        .into_result()?;

    tracing::info!(
        deposits = deposits.len(),
        withdrawals = withdrawals.len(),
        existing = seen.len(),
        "입출금 이력 조회 완료"
    );

    for deposit in deposits {
        if deposit.status != DEPOSIT_STATUS_SUCCESS {
            continue;
        }
        stats.total += 1;

        let Ok(amount) = deposit.amount.parse::<Decimal>() else {
            stats.failed += 1;
            tracing::warn!(amount = %deposit.amount, "입금 수량 파싱 실패");
            continue;
        };
        let Some((date, time)) = to_zone_parts(deposit.insert_time, config.display_tz) else {
            stats.failed += 1;
            continue;
        };

        let record = EventRecord {
            id: deposit.tx_id.clone(),
            kind: "deposit".to_string(),
            wallet: "binance".to_string(),
            coin: deposit.coin.clone(),
            amount,
            date,
            time,
            price: asset_price(binance, &deposit.coin).await,
        };
        apply_event(events, path, record, &policy, &mut seen, &mut stats).await?;
    }

    for withdraw in withdrawals {
        if withdraw.status != WITHDRAW_STATUS_COMPLETED {
            continue;
        }
        stats.total += 1;

        let Ok(amount) = withdraw.amount.parse::<Decimal>() else {
            stats.failed += 1;
            tracing::warn!(amount = %withdraw.amount, "출금 수량 파싱 실패");
            continue;
        };
        let (date, time) = split_apply_time(&withdraw.apply_time);

        let record = EventRecord {
            id: withdraw.id.clone(),
            kind: "withdraw".to_string(),
            wallet: "binance".to_string(),
            coin: withdraw.coin.clone(),
            amount,
            date,
            time,
            price: asset_price(binance, &withdraw.coin).await,
        };
        apply_event(events, path, record, &policy, &mut seen, &mut stats).await?;
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 복합 키 검사 후 이벤트를 추가합니다.
async fn apply_event(
    events: &RtdbStore,
    path: &str,
    record: EventRecord,
    policy: &RetryPolicy,
    seen: &mut HashSet<(String, String)>,
    stats: &mut SyncStats,
) -> Result<()> {
    let key = (record.id.clone(), record.kind.clone());
    if seen.contains(&key) {
        stats.skipped += 1;
        tracing::debug!(id = %record.id, kind = %record.kind, "기존 이벤트, 건너뜀");
        return Ok(());
    }

    match policy
        .run("이벤트 추가", || events.push(path, &record))
        .await
        .into_result()
    {
        Ok(_) => {
            stats.written += 1;
            seen.insert(key);
        }
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => {
            stats.failed += 1;
            tracing::error!(id = %record.id, error = %err, "이벤트 추가 실패");
        }
    }
    Ok(())
}

/// 자산의 USDT 기준 시세를 조회합니다.
///
/// 기축 자산은 1로 간주하고, 현재가 조회 실패 시 호가 중간값으로
/// 폴백합니다. 둘 다 실패하면 가격 없이 기록합니다.
async fn asset_price(binance: &BinanceReader, coin: &str) -> Option<Decimal> {
    if STABLE_COINS.contains(&coin) {
        return Some(Decimal::ONE);
    }

    let symbol = format!("{}USDT", coin);
    match binance.ticker_price(&symbol).await {
        Ok(price) => Some(price),
        Err(err) => {
            tracing::warn!(symbol, error = %err, "현재가 조회 실패, 호가 중간값 폴백");
            match binance.orderbook_mid(&symbol).await {
                Ok(mid) => Some(mid),
                Err(err) => {
                    tracing::warn!(symbol, error = %err, "시세 조회 실패, 가격 없이 기록");
                    None
                }
            }
        }
    }
}

/// "YYYY-MM-DD HH:MM:SS" 형식을 날짜와 시각으로 분리합니다.
fn split_apply_time(apply_time: &str) -> (String, String) {
    match apply_time.split_once(' ') {
        Some((date, time)) => (date.to_string(), time.to_string()),
        None => (apply_time.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_sources::BinanceConfig;

    fn flow_config(rtdb_url: &str) -> CollectorConfig {
        let mut config = crate::test_support::test_config();
        config.exchange.rtdb_url = Some(rtdb_url.to_string());
        config
    }

    #[test]
    fn test_split_apply_time() {
        let (date, time) = split_apply_time("2024-01-05 11:22:33");
        assert_eq!(date, "2024-01-05");
        assert_eq!(time, "11:22:33");

        let (date, time) = split_apply_time("malformed");
        assert_eq!(date, "malformed");
        assert!(time.is_empty());
    }

    #[tokio::test]
    async fn test_new_deposit_pushed_existing_skipped() {
        let mut exchange = mockito::Server::new_async().await;
        exchange
            .mock("GET", "/sapi/v1/capital/deposit/hisrec")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"amount":"100.5","coin":"USDT","status":1,"txId":"tx-new","insertTime":1704069000000},
                    {"amount":"50","coin":"USDT","status":1,"txId":"tx-old","insertTime":1704069000000},
                    {"amount":"7","coin":"USDT","status":0,"txId":"tx-pending","insertTime":1704069000000}]"#,
            )
            .create_async()
            .await;
        exchange
            .mock("GET", "/sapi/v1/capital/withdraw/history")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let mut rtdb = mockito::Server::new_async().await;
        // 키 집합은 사이클당 한 번만 조회되어야 함
        rtdb.mock("GET", "/events.json")
            .with_status(200)
            .with_body(
                r#"{"-Nold":{"id":"tx-old","type":"deposit","wallet":"binance","coin":"USDT","amount":50,"date":"2024-01-01","time":"07:30:00"}}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let push = rtdb
            .mock("POST", "/events.json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"id":"tx-new","type":"deposit","coin":"USDT","price":"1"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"name":"-Nnew"}"#)
            .create_async()
            .await;

        let reader = BinanceReader::new(
            BinanceConfig::new("k".to_string(), "s".to_string()).with_base_url(exchange.url()),
        )
        .unwrap();
        let events = RtdbStore::new(rtdb.url(), None).unwrap();

        let stats = sync_exchange_flows(&reader, &events, &flow_config(&rtdb.url()))
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped, 1);
        push.assert_async().await;
    }

    #[tokio::test]
    async fn test_completed_withdraw_uses_apply_time() {
        let mut exchange = mockito::Server::new_async().await;
        exchange
            .mock("GET", "/sapi/v1/capital/deposit/hisrec")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        exchange
            .mock("GET", "/sapi/v1/capital/withdraw/history")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"id":"w-1","amount":"25","coin":"USDT","status":6,"txId":"0xdef","applyTime":"2024-01-05 11:22:33"}]"#,
            )
            .create_async()
            .await;

        let mut rtdb = mockito::Server::new_async().await;
        rtdb.mock("GET", "/events.json")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;
        let push = rtdb
            .mock("POST", "/events.json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"id":"w-1","type":"withdraw","date":"2024-01-05","time":"11:22:33"}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"name":"-Nw"}"#)
            .create_async()
            .await;

        let reader = BinanceReader::new(
            BinanceConfig::new("k".to_string(), "s".to_string()).with_base_url(exchange.url()),
        )
        .unwrap();
        let events = RtdbStore::new(rtdb.url(), None).unwrap();

        let stats = sync_exchange_flows(&reader, &events, &flow_config(&rtdb.url()))
            .await
            .unwrap();

        assert_eq!(stats.written, 1);
        push.assert_async().await;
    }
}
