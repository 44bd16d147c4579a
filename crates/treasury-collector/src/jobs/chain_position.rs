//! 온체인 볼트 포지션 동기화.

use crate::orchestrator::{sync_rows, DedupKeyKind, RowRecord, SheetJobSpec};
use crate::{CollectorConfig, Result, RetryPolicy, SyncStats};
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use treasury_core::{now_ms, pool_value, to_zone_parts, tvl, Derived, TreasuryError};
use treasury_extract::{find_contract_address, ExtractionPipeline, FieldKind, FieldSpec};
use treasury_sources::{parse_address, ChainReader, RestSource, DEFAULT_RPC_TIMEOUT_SECS};
use treasury_store::{TabularStore, WriteSegment};

/// 온체인 포지션 평가액과 TVL을 하루 한 행으로 기록합니다.
///
/// 평가액 결정 순서:
/// 1. 수동 덮어쓰기 값이 있으면 그대로 사용
/// 2. 볼트 자산 수량 × 페이지에서 추출한 가격
/// 3. 가격이 없거나 0이면 자산 수량을 원금으로 간주
///
/// TVL은 페이지에서 추출한 총 공급량 × 가격이며, 산출할 수 없으면
/// `unavailable` 셀로 기록합니다.
pub async fn sync_chain_position<S: TabularStore>(
    store: &S,
    config: &CollectorConfig,
) -> Result<SyncStats> {
    let start = Instant::now();
    let mut stats = SyncStats::new();
    let cfg = &config.position;

    let Some((date, _)) = to_zone_parts(now_ms(), config.display_tz) else {
        return Err(TreasuryError::Validation("현재 시각 변환 실패".to_string()).into());
    };

    let (value, pool_tvl) = match cfg.manual_value {
        Some(manual) => {
            tracing::info!(value = %manual, "수동 평가액 사용");
            (manual, Derived::Unavailable)
        }
        None => fetch_position_value(config).await?,
    };
    if !pool_tvl.is_available() {
        stats.unavailable += 1;
    }

    let record = RowRecord::new(
        date.clone(),
        vec![
            WriteSegment::new(
                "A",
                vec![
                    date,
                    cfg.owner_label.clone(),
                    cfg.chain_label.clone(),
                    cfg.asset_label.clone(),
                ],
            ),
            // E 컬럼은 시트 수식 자리라 건드리지 않음
            WriteSegment::new("F", vec![value.round_dp(2).to_string(), pool_tvl.to_cell()]),
        ],
    );

    let spec = SheetJobSpec {
        name: "chain-position",
        worksheet: cfg.worksheet.clone(),
        key_column: "A",
        dedup: DedupKeyKind::DateOnly,
        header: vec![
            WriteSegment::new(
                "A",
                vec![
                    "Date".into(),
                    "Owner".into(),
                    "Chain".into(),
                    "Asset".into(),
                ],
            ),
            WriteSegment::new("F", vec!["Value".into(), "TVL".into()]),
        ],
        write_delay: config.request_delay(),
        write_retry: RetryPolicy::default(),
    };

    sync_rows(store, &spec, vec![record], &mut stats).await?;
    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 체인과 페이지에서 포지션 평가액과 TVL을 산출합니다.
async fn fetch_position_value(config: &CollectorConfig) -> Result<(Decimal, Derived)> {
    let cfg = &config.position;
    let policy = RetryPolicy::default();
    let reader = ChainReader::new(
        &cfg.rpc_url,
        Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
    )?;

    // 페이지 본문은 주소 탐색과 가격 추출 양쪽에 쓰임
    let page_body = match &cfg.page_base_url {
        Some(base) => {
            let source = RestSource::new(base, 30)?;
            Some(
                policy
                    .run("포지션 페이지 조회", || source.fetch_page(&cfg.page_path))
                    .await
                    .into_result()?,
            )
        }
        None => None,
    };

    let vault = parse_address(&resolve_vault_address(cfg, page_body.as_deref())?)?;

    // 쉼표로 구분된 여러 지갑의 자산을 합산
    let mut wallets = Vec::new();
    for entry in cfg.wallet_address.split(',') {
        let entry = entry.trim();
        if !entry.is_empty() {
            wallets.push(parse_address(entry)?);
        }
    }
    if wallets.is_empty() {
        return Err(crate::error::CollectorError::Config(
            "WALLET_ADDRESS가 비어 있습니다".to_string(),
        ));
    }

    let mut amount = Decimal::ZERO;
    for wallet in wallets {
        let assets = policy
            .run("볼트 자산 조회", || {
                reader.erc4626_assets(vault, wallet, cfg.token_decimals)
            })
            .await
            .into_result()?;
        tracing::debug!(%wallet, %assets, "지갑 자산 조회 완료");
        amount += assets;
    }

    if !FieldKind::PositiveAmount.validate(amount) {
        return Err(TreasuryError::Validation(format!(
            "볼트 자산 수량이 양수가 아님: {}",
            amount
        ))
        .into());
    }

    let price = page_body
        .as_deref()
        .map(extract_price)
        .unwrap_or(Decimal::ZERO);

    // 가격이 0이면 원금(수량 그대로)으로 폴백
    let value = pool_value(amount, price, amount, None);
    let pool_tvl = page_body
        .as_deref()
        .map(|body| derive_tvl(body, price))
        .unwrap_or(Derived::Unavailable);
    tracing::info!(%amount, %price, %value, tvl = %pool_tvl.to_cell(), "포지션 평가액 산출 완료");
    Ok((value, pool_tvl))
}

/// 페이지 본문에서 TVL(총 공급량 × 가격)을 산출합니다.
fn derive_tvl(body: &str, price: Decimal) -> Derived {
    if price <= Decimal::ZERO {
        return Derived::Unavailable;
    }

    let field = match FieldSpec::new("supply", FieldKind::PositiveAmount)
        .with_pattern(r"(?i)total\s*supply[^0-9]*([0-9][\d,]*\.?\d*\s*[KMB]?)")
    {
        Ok(field) => field.with_json_key("totalSupply"),
        Err(err) => {
            tracing::error!(error = %err, "공급량 패턴 구성 실패");
            return Derived::Unavailable;
        }
    };

    match ExtractionPipeline::new(field).run(body) {
        Ok(supply) => Derived::Value(tvl(supply, price).round_dp(2).normalize()),
        Err(err) => {
            tracing::warn!(error = %err, "공급량 추출 실패, TVL 미산출");
            Derived::Unavailable
        }
    }
}

/// 설정 주소가 없으면 페이지 본문에서 컨트랙트 주소를 찾습니다.
fn resolve_vault_address(
    cfg: &crate::config::PositionConfig,
    page_body: Option<&str>,
) -> Result<String> {
    if !cfg.vault_address.is_empty() {
        return Ok(cfg.vault_address.clone());
    }

    let body = page_body.ok_or_else(|| {
        crate::error::CollectorError::Config(
            "VAULT_ADDRESS 또는 POSITION_PAGE_BASE_URL 중 하나는 필요합니다".to_string(),
        )
    })?;

    find_contract_address(body, &cfg.asset_label)
        .inspect(|address| tracing::info!(address, "페이지에서 볼트 주소 탐색 완료"))
        .ok_or_else(|| {
            TreasuryError::Extraction("페이지에서 컨트랙트 주소를 찾지 못함".to_string()).into()
        })
}

/// 페이지 본문에서 자산 가격을 추출합니다. 실패하면 0을 반환합니다.
fn extract_price(body: &str) -> Decimal {
    let field = match FieldSpec::new("price", FieldKind::Price)
        .with_pattern(r"\$\s*([0-9][\d,]*\.?\d*)")
    {
        Ok(field) => field.with_json_key("price"),
        Err(err) => {
            tracing::error!(error = %err, "가격 패턴 구성 실패");
            return Decimal::ZERO;
        }
    };

    match ExtractionPipeline::new(field).run(body) {
        Ok(price) => price,
        Err(err) => {
            tracing::warn!(error = %err, "가격 추출 실패, 원금 기준으로 평가");
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use treasury_store::InMemoryStore;

    fn test_config(rpc_url: &str) -> CollectorConfig {
        let mut config = crate::test_support::test_config();
        config.position.rpc_url = rpc_url.to_string();
        config
    }

    #[tokio::test]
    async fn test_manual_override_skips_chain_read() {
        let store = InMemoryStore::new();
        let mut config = test_config("http://unused.invalid");
        config.position.manual_value = Some(dec!(9999.99));

        let stats = sync_chain_position(&store, &config).await.unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.unavailable, 1);
        let grid = store.snapshot("Positions");
        assert_eq!(grid[1][1], "GS");
        assert_eq!(grid[1][4], "");
        assert_eq!(grid[1][5], "9999.99");
        assert_eq!(grid[1][6], "unavailable");
    }

    #[tokio::test]
    async fn test_chain_read_writes_principal_without_price() {
        let mut server = mockito::Server::new_async().await;
        // balanceOf와 convertToAssets 모두 2e18을 반환 (1:1 전환)
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,
                    "result":"0x0000000000000000000000000000000000000000000000001bc16d674ec80000"}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let store = InMemoryStore::new();
        let stats = sync_chain_position(&store, &test_config(&server.url()))
            .await
            .unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.unavailable, 1);
        let grid = store.snapshot("Positions");
        assert_eq!(grid[1][5], "2");
        assert_eq!(grid[1][6], "unavailable");
    }

    #[tokio::test]
    async fn test_page_backed_tvl_is_written() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,
                    "result":"0x0000000000000000000000000000000000000000000000001bc16d674ec80000"}"#,
            )
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/pool")
            .with_status(200)
            .with_body(r#"<script>{"price":"2","totalSupply":"1000"}</script>"#)
            .create_async()
            .await;

        let store = InMemoryStore::new();
        let mut config = test_config(&server.url());
        config.position.page_base_url = Some(server.url());
        config.position.page_path = "/pool".to_string();

        let stats = sync_chain_position(&store, &config).await.unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.unavailable, 0);
        let grid = store.snapshot("Positions");
        // 평가액 = 2 × $2, TVL = 1000 × $2
        assert_eq!(grid[1][5], "4");
        assert_eq!(grid[1][6], "2000");
    }

    #[tokio::test]
    async fn test_multiple_wallets_are_summed() {
        let mut server = mockito::Server::new_async().await;
        // 지갑 2개 × (balanceOf + convertToAssets) = 4회 호출
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,
                    "result":"0x0000000000000000000000000000000000000000000000001bc16d674ec80000"}"#,
            )
            .expect(4)
            .create_async()
            .await;

        let store = InMemoryStore::new();
        let mut config = test_config(&server.url());
        config.position.wallet_address = "0x2222222222222222222222222222222222222222, \
             0x3333333333333333333333333333333333333333"
            .to_string();

        let stats = sync_chain_position(&store, &config).await.unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(store.snapshot("Positions")[1][5], "4");
    }

    #[tokio::test]
    async fn test_second_run_same_day_skips() {
        let store = InMemoryStore::new();
        let mut config = test_config("http://unused.invalid");
        config.position.manual_value = Some(dec!(100));

        let first = sync_chain_position(&store, &config).await.unwrap();
        let second = sync_chain_position(&store, &config).await.unwrap();

        assert_eq!(first.written, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.written, 0);
    }

    #[tokio::test]
    async fn test_missing_address_and_page_is_config_error() {
        let store = InMemoryStore::new();
        let mut config = test_config("http://unused.invalid");
        config.position.vault_address = String::new();

        let err = sync_chain_position(&store, &config).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CollectorError::Config(_)
        ));
    }
}
