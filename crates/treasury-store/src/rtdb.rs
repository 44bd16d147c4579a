//! Firebase 실시간 DB 스타일 이벤트 저장소.
//!
//! 입출금 이벤트를 push 형식으로 추가하며, 멱등성은 사이클당 한 번
//! 읽어 온 (id, type) 복합 키 집합으로 검사해 보장합니다.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use treasury_core::{TreasuryError, TreasuryResult};

/// 입출금 이벤트 레코드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// 원천 시스템의 트랜잭션 식별자
    pub id: String,
    /// 이벤트 종류 ("deposit" / "withdraw")
    #[serde(rename = "type")]
    pub kind: String,
    pub wallet: String,
    pub coin: String,
    pub amount: Decimal,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// REST 기반 이벤트 저장소 클라이언트.
pub struct RtdbStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
}

impl RtdbStore {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `Config` 에러를 반환합니다.
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> TreasuryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TreasuryError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        self.auth
            .as_deref()
            .map(|token| vec![("auth", token)])
            .unwrap_or_default()
    }

    /// 노드 아래 전체 이벤트 조회. 빈 노드는 빈 맵으로 돌려줍니다.
    pub async fn list(&self, path: &str) -> TreasuryResult<HashMap<String, EventRecord>> {
        let records: Option<HashMap<String, EventRecord>> = self
            .client
            .get(self.node_url(path))
            .query(&self.auth_query())
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(TreasuryError::transient)?
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))?;

        Ok(records.unwrap_or_default())
    }

    /// 노드의 (id, type) 복합 키 집합 조회.
    ///
    /// 사이클당 한 번 호출해 캐시하고, 개별 레코드는 집합에서
    /// 검사합니다 (레코드마다 전체 노드를 다시 읽지 않음).
    pub async fn event_keys(&self, path: &str) -> TreasuryResult<HashSet<(String, String)>> {
        let records = self.list(path).await?;
        Ok(records
            .into_values()
            .map(|record| (record.id, record.kind))
            .collect())
    }

    /// 이벤트 추가. 생성된 push 키를 반환합니다.
    pub async fn push(&self, path: &str, record: &EventRecord) -> TreasuryResult<String> {
        let response: PushResponse = self
            .client
            .post(self.node_url(path))
            .query(&self.auth_query())
            .json(record)
            .send()
            .await
            .map_err(TreasuryError::transient)?
            .error_for_status()
            .map_err(|e| TreasuryError::Store(format!("이벤트 추가 실패 ({}): {}", path, e)))?
            .json()
            .await
            .map_err(|e| TreasuryError::Serialization(e.to_string()))?;

        tracing::info!(path, id = %record.id, kind = %record.kind, "이벤트 추가 완료");
        Ok(response.name)
    }
}
