//! 공개 REST API 어댑터.
//!
//! 볼트 트렌드형 엔드포인트(`{ code, data: { list } }` 봉투)와
//! 추출 파이프라인에 넘길 렌더링된 페이지 본문을 가져옵니다.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use treasury_core::{TreasuryError, TreasuryResult};

/// 볼트 트렌드 조회 파라미터.
#[derive(Debug, Clone)]
pub struct TrendQuery {
    /// 볼트 ID
    pub vault_id: u64,
    /// 트렌드 종류 (예: "dailyReturnRate")
    pub trend_type: String,
    /// 볼트 종류
    pub vault_type: String,
    /// 조회 일수
    pub days: u32,
}

impl Default for TrendQuery {
    fn default() -> Self {
        Self {
            vault_id: 1,
            trend_type: "dailyReturnRate".to_string(),
            vault_type: "vault".to_string(),
            days: 30,
        }
    }
}

/// 볼트 트렌드 레코드.
///
/// `snapshot_time`은 에포크 밀리초 문자열이며 이벤트 ID 기반
/// 중복 키로 그대로 사용됩니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub snapshot_time: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
struct TrendEnvelope {
    code: String,
    data: Option<TrendData>,
}

#[derive(Debug, Deserialize)]
struct TrendData {
    list: Vec<TrendRecord>,
}

/// 공개 REST 소스.
pub struct RestSource {
    client: Client,
    base_url: String,
}

impl RestSource {
    /// 새 소스 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `Config` 에러를 반환합니다.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> TreasuryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("treasury-sync/0.1")
            .build()
            .map_err(|e| TreasuryError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// 볼트 트렌드 목록 조회.
    pub async fn fetch_vault_trends(&self, query: &TrendQuery) -> TreasuryResult<Vec<TrendRecord>> {
        let url = format!("{}/api/v1/public/vault/vaultTrends", self.base_url);

        tracing::debug!(%url, vault_id = query.vault_id, days = query.days, "볼트 트렌드 조회");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vaultId", query.vault_id.to_string()),
                ("trendtype", query.trend_type.clone()),
                ("vaultType", query.vault_type.clone()),
                ("days", query.days.to_string()),
            ])
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?;

        let envelope: TrendEnvelope = response
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))?;

        if envelope.code != "SUCCESS" {
            return Err(TreasuryError::TransientIo(format!(
                "볼트 트렌드 응답 코드 실패: {}",
                envelope.code
            )));
        }

        let records = envelope.data.map(|d| d.list).unwrap_or_default();
        tracing::info!(count = records.len(), "볼트 트렌드 조회 완료");
        Ok(records)
    }

    /// 페이지 본문 조회 (추출 파이프라인 입력).
    pub async fn fetch_page(&self, path: &str) -> TreasuryResult<String> {
        let url = format!("{}{}", self.base_url, path);

        self.client
            .get(&url)
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?
            .text()
            .await
            .map_err(TreasuryError::transient)
    }

}
