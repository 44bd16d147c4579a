//! 단위 테스트용 설정 헬퍼.

use crate::config::{
    CollectorConfig, DaemonConfig, ExchangeConfig, PositionConfig, VaultTrendConfig,
};
use treasury_core::DEFAULT_DISPLAY_TZ;

/// 외부 원천이 비어 있는 기본 설정. 각 테스트가 필요한 필드만 채운다.
pub fn test_config() -> CollectorConfig {
    CollectorConfig {
        spreadsheet_id: "sheet-id".to_string(),
        service_account_b64: None,
        access_token: None,
        display_tz: DEFAULT_DISPLAY_TZ,
        request_delay_ms: 0,
        vault_trend: VaultTrendConfig {
            enabled: true,
            base_url: String::new(),
            vault_id: 1,
            days: 30,
            lookback_days: 30,
            worksheet: "Trends".to_string(),
            timeout_secs: 10,
        },
        position: PositionConfig {
            enabled: true,
            rpc_url: String::new(),
            vault_address: "0x1111111111111111111111111111111111111111".to_string(),
            wallet_address: "0x2222222222222222222222222222222222222222".to_string(),
            token_decimals: 18,
            asset_label: "USDS".to_string(),
            chain_label: "Ethereum".to_string(),
            owner_label: "GS".to_string(),
            worksheet: "Positions".to_string(),
            page_base_url: None,
            page_path: "/".to_string(),
            manual_value: None,
        },
        exchange: ExchangeConfig {
            balance_enabled: true,
            flow_enabled: true,
            balance_worksheet: "Exchange".to_string(),
            rtdb_url: None,
            rtdb_auth: None,
            rtdb_path: "events".to_string(),
        },
        daemon: DaemonConfig {
            interval_minutes: 60,
        },
    }
}
