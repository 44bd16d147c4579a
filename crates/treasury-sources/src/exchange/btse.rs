//! BTSE 조회 클라이언트.
//!
//! HMAC-SHA384로 `경로 + nonce + 본문`을 서명하며, 서명은 세 개의
//! 헤더(request-api / request-nonce / request-sign)로 전달합니다.
//! 계정 권한에 따라 일부 earn 엔드포인트가 막혀 있을 수 있어
//! 대체 엔드포인트 목록을 순서대로 시도합니다.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha384;
use std::fmt;
use std::time::Duration;
use treasury_core::{now_ms, TreasuryError, TreasuryResult};

type HmacSha384 = Hmac<Sha384>;

/// 권한 문제 시 순서대로 시도할 earn 포지션 엔드포인트.
const EARN_POSITION_ENDPOINTS: [&str; 4] = [
    "/api/v3.3/invest/orders",
    "/api/v3.3/invest/positions",
    "/api/v3.3/invest/active",
    "/api/v3.3/invest/current",
];

/// BTSE 클라이언트 설정.
#[derive(Clone)]
pub struct BtseConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: String,
    /// REST 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl fmt::Debug for BtseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtseConfig")
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BtseConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            base_url: "https://api.btse.com/spot".to_string(),
            timeout_secs: 30,
        }
    }

    /// 기본 URL 교체 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 환경 변수에서 생성.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BTSE_API_KEY").ok()?;
        let api_secret = std::env::var("BTSE_SECRET_KEY").ok()?;
        Some(Self::new(api_key, api_secret))
    }
}

/// 지갑 잔고 항목.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub currency: String,
    #[serde(default)]
    pub total_value: Option<Decimal>,
    #[serde(default)]
    pub available_balance: Option<Decimal>,
}

/// earn 포지션 항목 (엔드포인트별 스키마 차이를 흡수).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnPosition {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// BTSE 조회 전용 클라이언트.
pub struct BtseReader {
    config: BtseConfig,
    client: Client,
}

impl BtseReader {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `Config` 에러를 반환합니다.
    pub fn new(config: BtseConfig) -> TreasuryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TreasuryError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 서명 생성: HMAC-SHA384(경로 + nonce + 본문) hex.
    fn sign(&self, endpoint: &str, nonce: &str, body: Option<&str>) -> TreasuryResult<String> {
        let mut message = format!("{}{}", endpoint, nonce);
        if let Some(body) = body {
            message.push_str(body);
        }

        let mut mac = HmacSha384::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| TreasuryError::Config(format!("잘못된 API 시크릿: {}", e)))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 서명된 GET 요청.
    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> TreasuryResult<T> {
        let nonce = now_ms().to_string();
        let signature = self.sign(endpoint, &nonce, None)?;
        let url = format!("{}{}", self.config.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header("request-api", &self.config.api_key)
            .header("request-nonce", &nonce)
            .header("request-sign", &signature)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(TreasuryError::transient)?;

        let status = response.status();
        let body = response.text().await.map_err(TreasuryError::transient)?;

        if !status.is_success() {
            return Err(TreasuryError::TransientIo(format!(
                "BTSE 요청 실패 ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| TreasuryError::Serialization(e.to_string()))
    }

    /// 지갑 잔고 조회.
    pub async fn wallet_balances(&self) -> TreasuryResult<Vec<WalletBalance>> {
        self.signed_get("/api/v3.3/user/wallet").await
    }

    /// earn 포지션 조회.
    ///
    /// API 키 권한이 부족한 엔드포인트는 건너뛰고 다음 후보를
    /// 시도합니다. 전부 권한 문제로 실패하면 빈 목록을 반환합니다.
    pub async fn earn_positions(&self) -> TreasuryResult<Vec<EarnPosition>> {
        for endpoint in EARN_POSITION_ENDPOINTS {
            match self.signed_get::<Vec<EarnPosition>>(endpoint).await {
                Ok(positions) => {
                    tracing::info!(endpoint, count = positions.len(), "earn 포지션 조회 완료");
                    return Ok(positions);
                }
                Err(TreasuryError::TransientIo(msg))
                    if msg.contains("not allowed for current API Key") =>
                {
                    tracing::warn!(endpoint, "API 키 권한 부족, 다음 엔드포인트 시도");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::warn!("모든 earn 엔드포인트가 권한 부족으로 실패");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_known_vector() {
        let config = BtseConfig::new("k".to_string(), "test-secret".to_string());
        let reader = BtseReader::new(config).unwrap();

        let signature = reader
            .sign("/api/v3.3/user/wallet", "1700000000000", None)
            .unwrap();
        assert_eq!(
            signature,
            "a208ae1119a212a0a42221517477a4cf617910af15f37ae334079826117b0c62d750b36e5039e3080b59b02142593b01"
        );
    }

    #[tokio::test]
    async fn test_wallet_balances() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3.3/user/wallet")
            .match_header("request-api", "test-key")
            .with_status(200)
            .with_body(
                r#"[{"currency":"USDT","totalValue":1234.56,"availableBalance":1200}]"#,
            )
            .create_async()
            .await;

        let config = BtseConfig::new("test-key".to_string(), "s".to_string())
            .with_base_url(server.url());
        let reader = BtseReader::new(config).unwrap();
        let balances = reader.wallet_balances().await.unwrap();

        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].currency, "USDT");
        assert_eq!(balances[0].total_value, Some(dec!(1234.56)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_earn_positions_permission_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3.3/invest/orders")
            .with_status(403)
            .with_body("This action is not allowed for current API Key")
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3.3/invest/positions")
            .with_status(200)
            .with_body(r#"[{"currency":"USDT","amount":500}]"#)
            .create_async()
            .await;

        let config = BtseConfig::new("k".to_string(), "s".to_string())
            .with_base_url(server.url());
        let reader = BtseReader::new(config).unwrap();
        let positions = reader.earn_positions().await.unwrap();

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].amount, Some(dec!(500)));
    }
}
