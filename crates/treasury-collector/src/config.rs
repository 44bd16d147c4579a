//! 환경변수 기반 설정 모듈.

use crate::Result;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::time::Duration;
use treasury_core::DEFAULT_DISPLAY_TZ;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 스프레드시트 문서 ID
    pub spreadsheet_id: String,
    /// base64로 인코딩된 서비스 계정 키 JSON
    pub service_account_b64: Option<String>,
    /// 고정 액세스 토큰 (서비스 계정 대신 사용)
    pub access_token: Option<String>,
    /// 날짜/시간 표기 타임존
    pub display_tz: Tz,
    /// 작업 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 볼트 트렌드 동기화 설정
    pub vault_trend: VaultTrendConfig,
    /// 온체인 포지션 동기화 설정
    pub position: PositionConfig,
    /// 거래소 동기화 설정
    pub exchange: ExchangeConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 볼트 트렌드 동기화 설정
#[derive(Debug, Clone)]
pub struct VaultTrendConfig {
    /// 동기화 활성화
    pub enabled: bool,
    /// 트렌드 API 기본 URL
    pub base_url: String,
    /// 볼트 ID
    pub vault_id: u64,
    /// 조회 일수
    pub days: u32,
    /// APY 산출 기준 일수
    pub lookback_days: u32,
    /// 대상 워크시트
    pub worksheet: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 온체인 포지션 동기화 설정
#[derive(Debug, Clone)]
pub struct PositionConfig {
    /// 동기화 활성화
    pub enabled: bool,
    /// JSON-RPC 엔드포인트
    pub rpc_url: String,
    /// ERC-4626 볼트 컨트랙트 주소 (비어 있으면 페이지에서 탐색)
    pub vault_address: String,
    /// 지갑 주소 (쉼표로 여러 개 지정 가능)
    pub wallet_address: String,
    /// 기초 자산 소수점 자리수
    pub token_decimals: u32,
    /// 자산 심볼 표기
    pub asset_label: String,
    /// 체인 표기
    pub chain_label: String,
    /// 소유 주체 표기
    pub owner_label: String,
    /// 대상 워크시트
    pub worksheet: String,
    /// 가격/주소 추출용 페이지 URL 기본부
    pub page_base_url: Option<String>,
    /// 페이지 경로
    pub page_path: String,
    /// 평가액 수동 덮어쓰기
    pub manual_value: Option<Decimal>,
}

/// 거래소 동기화 설정
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// 잔고 동기화 활성화
    pub balance_enabled: bool,
    /// 입출금 동기화 활성화
    pub flow_enabled: bool,
    /// 잔고 워크시트
    pub balance_worksheet: String,
    /// 이벤트 저장소 URL
    pub rtdb_url: Option<String>,
    /// 이벤트 저장소 인증 토큰
    pub rtdb_auth: Option<String>,
    /// 이벤트 노드 경로
    pub rtdb_path: String,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spreadsheet_id = std::env::var("SPREADSHEET_ID").map_err(|_| {
            crate::error::CollectorError::Config(
                "SPREADSHEET_ID 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        Ok(Self {
            spreadsheet_id,
            service_account_b64: std::env::var("SERVICE_ACCOUNT_B64").ok(),
            access_token: std::env::var("SHEETS_ACCESS_TOKEN").ok(),
            display_tz: env_var_parse("DISPLAY_TZ", DEFAULT_DISPLAY_TZ),
            request_delay_ms: env_var_parse("REQUEST_DELAY_MS", 1000),
            vault_trend: VaultTrendConfig {
                enabled: env_var_bool("VAULT_TREND_ENABLED", true),
                base_url: std::env::var("VAULT_TREND_BASE_URL")
                    .unwrap_or_else(|_| "https://pro.edgex.exchange".to_string()),
                vault_id: env_var_parse("VAULT_TREND_VAULT_ID", 1),
                days: env_var_parse("VAULT_TREND_DAYS", 30),
                lookback_days: env_var_parse("VAULT_TREND_LOOKBACK_DAYS", 30),
                worksheet: std::env::var("VAULT_TREND_WORKSHEET")
                    .unwrap_or_else(|_| "Trends".to_string()),
                timeout_secs: env_var_parse("VAULT_TREND_TIMEOUT_SECS", 10),
            },
            position: PositionConfig {
                enabled: env_var_bool("POSITION_ENABLED", true),
                rpc_url: std::env::var("RPC_URL")
                    .unwrap_or_else(|_| "https://eth.llamarpc.com".to_string()),
                vault_address: std::env::var("VAULT_ADDRESS").unwrap_or_default(),
                wallet_address: std::env::var("WALLET_ADDRESS").unwrap_or_default(),
                token_decimals: env_var_parse("TOKEN_DECIMALS", 18),
                asset_label: std::env::var("ASSET_LABEL").unwrap_or_else(|_| "USDS".to_string()),
                chain_label: std::env::var("CHAIN_LABEL")
                    .unwrap_or_else(|_| "Ethereum".to_string()),
                owner_label: std::env::var("OWNER_LABEL").unwrap_or_else(|_| "GS".to_string()),
                worksheet: std::env::var("POSITION_WORKSHEET")
                    .unwrap_or_else(|_| "Positions".to_string()),
                page_base_url: std::env::var("POSITION_PAGE_BASE_URL").ok(),
                page_path: std::env::var("POSITION_PAGE_PATH").unwrap_or_else(|_| "/".to_string()),
                manual_value: std::env::var("POSITION_MANUAL_VALUE")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            exchange: ExchangeConfig {
                balance_enabled: env_var_bool("EXCHANGE_BALANCE_ENABLED", true),
                flow_enabled: env_var_bool("EXCHANGE_FLOW_ENABLED", true),
                balance_worksheet: std::env::var("EXCHANGE_BALANCE_WORKSHEET")
                    .unwrap_or_else(|_| "Exchange".to_string()),
                rtdb_url: std::env::var("RTDB_URL").ok(),
                rtdb_auth: std::env::var("RTDB_AUTH").ok(),
                rtdb_path: std::env::var("RTDB_PATH").unwrap_or_else(|_| "events".to_string()),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 60),
            },
        })
    }

    /// 작업 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
