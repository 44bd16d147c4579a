//! Binance 조회 클라이언트.
//!
//! HMAC-SHA256으로 쿼리 스트링을 서명하는 읽기 전용 엔드포인트 구현:
//! 입금/출금 이력, 유연 예치 포지션, 시세 조회.

#![allow(dead_code)] // API 응답 필드 전체 매핑 (일부만 사용)

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use treasury_core::{now_ms, TreasuryError, TreasuryResult};

type HmacSha256 = Hmac<Sha256>;

/// Binance 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct BinanceConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: String,
    /// REST 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("BinanceConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BinanceConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            base_url: "https://api.binance.com".to_string(),
            timeout_secs: 30,
            recv_window: 5000,
        }
    }

    /// 기본 URL 교체 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 환경 변수에서 생성.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").ok()?;
        let api_secret = std::env::var("BINANCE_API_SECRET").ok()?;
        Some(Self::new(api_key, api_secret))
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// 입금 레코드.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub amount: String,
    pub coin: String,
    pub status: i32,
    pub tx_id: String,
    /// 입금 확정 시각 (에포크 밀리초)
    pub insert_time: i64,
}

/// 출금 레코드.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRecord {
    pub id: String,
    pub amount: String,
    pub coin: String,
    pub status: i32,
    #[serde(default)]
    pub tx_id: Option<String>,
    /// 신청 시각 ("YYYY-MM-DD HH:MM:SS")
    pub apply_time: String,
}

/// 유연 예치 포지션.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexiblePosition {
    pub asset: String,
    pub total_amount: String,
    #[serde(default)]
    pub latest_annual_percentage_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlexiblePositionPage {
    rows: Vec<FlexiblePosition>,
    total: u32,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderBookTop {
    last_update_id: i64,
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Binance 조회 전용 클라이언트.
pub struct BinanceReader {
    config: BinanceConfig,
    client: Client,
}

impl BinanceReader {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `Config` 에러를 반환합니다.
    pub fn new(config: BinanceConfig) -> TreasuryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TreasuryError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 쿼리 스트링 서명 (HMAC-SHA256 hex).
    fn sign(&self, query: &str) -> TreasuryResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| TreasuryError::Config(format!("잘못된 API 시크릿: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 서명된 GET 요청.
    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        extra_query: Option<&str>,
    ) -> TreasuryResult<T> {
        let mut query = match extra_query {
            Some(extra) => format!("{}&timestamp={}", extra, now_ms()),
            None => format!("timestamp={}", now_ms()),
        };
        query.push_str(&format!("&recvWindow={}", self.config.recv_window));

        let signature = self.sign(&query)?;
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.base_url, endpoint, query, signature
        );

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?;

        response
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))
    }

    /// 입금 이력 조회.
    pub async fn deposit_history(&self) -> TreasuryResult<Vec<DepositRecord>> {
        self.signed_get("/sapi/v1/capital/deposit/hisrec", None)
            .await
    }

    /// 출금 이력 조회.
    pub async fn withdraw_history(&self) -> TreasuryResult<Vec<WithdrawRecord>> {
        self.signed_get("/sapi/v1/capital/withdraw/history", None)
            .await
    }

    /// 유연 예치 포지션 조회.
    pub async fn flexible_positions(&self) -> TreasuryResult<Vec<FlexiblePosition>> {
        let page: FlexiblePositionPage = self
            .signed_get("/sapi/v1/simple-earn/flexible/position", None)
            .await?;

        tracing::debug!(total = page.total, "유연 예치 포지션 조회 완료");
        Ok(page.rows)
    }

    /// 현재가 조회 (공개 엔드포인트, 서명 불필요).
    pub async fn ticker_price(&self, symbol: &str) -> TreasuryResult<Decimal> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.config.base_url, symbol
        );

        let ticker: TickerPrice = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))?;

        ticker
            .price
            .parse()
            .map_err(|_| TreasuryError::Serialization(format!("가격 파싱 실패: {}", ticker.price)))
    }

    /// 호가 중간값 조회 (현재가 실패 시 폴백).
    pub async fn orderbook_mid(&self, symbol: &str) -> TreasuryResult<Decimal> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit=5",
            self.config.base_url, symbol
        );

        let book: OrderBookTop = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))?;

        let best_bid: Decimal = book
            .bids
            .first()
            .and_then(|level| level[0].parse().ok())
            .ok_or_else(|| TreasuryError::Serialization("매수 호가 없음".to_string()))?;
        let best_ask: Decimal = book
            .asks
            .first()
            .and_then(|level| level[0].parse().ok())
            .ok_or_else(|| TreasuryError::Serialization("매도 호가 없음".to_string()))?;

        Ok((best_bid + best_ask) / Decimal::TWO)
    }
}
