//! 온체인 잔고 조회 (raw `eth_call` JSON-RPC).
//!
//! 전용 프로바이더 없이 reqwest로 JSON-RPC를 직접 호출합니다.
//! ABI 인코딩/디코딩은 `alloy-sol-types`의 `sol!` 매크로를 사용합니다.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use rust_decimal::Decimal;
use std::time::Duration;
use treasury_core::{TreasuryError, TreasuryResult};

sol! {
    /// ERC-20 잔고 조회
    interface IErc20 {
        function balanceOf(address account) external view returns (uint256);
    }

    /// ERC-4626 볼트 조회
    interface IErc4626 {
        function balanceOf(address account) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256);
        function previewRedeem(uint256 shares) external view returns (uint256);
    }
}

/// 기본 RPC 타임아웃 (초).
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 15;

/// 체크섬 없는 hex 문자열을 주소로 파싱.
///
/// # Errors
/// 형식이 잘못된 주소는 `Config` 에러를 반환합니다.
pub fn parse_address(s: &str) -> TreasuryResult<Address> {
    s.trim()
        .parse()
        .map_err(|_| TreasuryError::Config(format!("잘못된 컨트랙트 주소: {}", s)))
}

/// JSON-RPC 기반 온체인 리더.
#[derive(Debug, Clone)]
pub struct ChainReader {
    client: reqwest::Client,
    rpc_url: String,
}

impl ChainReader {
    /// 새 리더 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `Config` 에러를 반환합니다.
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> TreasuryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TreasuryError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    /// ERC-20 토큰 잔고 조회.
    ///
    /// 반환값은 `10^decimals`로 나눈 Decimal입니다.
    pub async fn erc20_balance(
        &self,
        token: Address,
        wallet: Address,
        decimals: u32,
    ) -> TreasuryResult<Decimal> {
        let data = IErc20::balanceOfCall { account: wallet }.abi_encode();
        let response = self.eth_call(token, data).await?;
        let raw = IErc20::balanceOfCall::abi_decode_returns(&response)
            .map_err(|e| TreasuryError::Serialization(format!("balanceOf 디코딩 실패: {}", e)))?;

        scale_down(raw, decimals)
    }

    /// ERC-4626 볼트 포지션을 기초 자산 단위로 조회.
    ///
    /// `balanceOf`로 지분을 읽은 뒤 `convertToAssets`로 환산합니다.
    /// `convertToAssets`가 실패하면(미구현/revert) `previewRedeem`으로
    /// 폴백합니다.
    pub async fn erc4626_assets(
        &self,
        vault: Address,
        wallet: Address,
        decimals: u32,
    ) -> TreasuryResult<Decimal> {
        let data = IErc4626::balanceOfCall { account: wallet }.abi_encode();
        let response = self.eth_call(vault, data).await?;
        let shares = IErc4626::balanceOfCall::abi_decode_returns(&response)
            .map_err(|e| TreasuryError::Serialization(format!("balanceOf 디코딩 실패: {}", e)))?;

        if shares.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let convert = IErc4626::convertToAssetsCall { shares }.abi_encode();
        let assets = match self.eth_call(vault, convert).await {
            Ok(response) => IErc4626::convertToAssetsCall::abi_decode_returns(&response)
                .map_err(|e| {
                    TreasuryError::Serialization(format!("convertToAssets 디코딩 실패: {}", e))
                })?,
            Err(err) => {
                // 일부 볼트는 convertToAssets를 노출하지 않음
                tracing::warn!(%vault, error = %err, "convertToAssets 실패, previewRedeem 폴백");
                let preview = IErc4626::previewRedeemCall { shares }.abi_encode();
                let response = self.eth_call(vault, preview).await?;
                IErc4626::previewRedeemCall::abi_decode_returns(&response).map_err(|e| {
                    TreasuryError::Serialization(format!("previewRedeem 디코딩 실패: {}", e))
                })?
            }
        };

        scale_down(assets, decimals)
    }

    /// raw `eth_call` 실행.
    async fn eth_call(&self, to: Address, data: Vec<u8>) -> TreasuryResult<Vec<u8>> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{:#x}", to),
                    "data": format!("0x{}", hex::encode(&data))
                },
                "latest"
            ],
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(TreasuryError::transient)?;

        let response_json: serde_json::Value =
            response.json().await.map_err(TreasuryError::transient)?;

        if let Some(error) = response_json.get("error") {
            return Err(TreasuryError::TransientIo(format!("RPC 에러: {}", error)));
        }

        let result = response_json
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| {
                TreasuryError::Serialization("RPC 응답에 result 필드 없음".to_string())
            })?;

        hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| TreasuryError::Serialization(format!("hex 디코딩 실패: {}", e)))
    }
}

/// U256 원시값을 `10^decimals`로 나눈 Decimal로 변환.
fn scale_down(raw: U256, decimals: u32) -> TreasuryResult<Decimal> {
    if decimals > 28 {
        return Err(TreasuryError::Validation(format!(
            "지원 범위를 벗어난 decimals: {}",
            decimals
        )));
    }

    let value: u128 = raw
        .try_into()
        .map_err(|_| TreasuryError::Validation(format!("잔고 값이 너무 큼: {}", raw)))?;
    if value > i128::MAX as u128 {
        return Err(TreasuryError::Validation(format!(
            "잔고 값이 너무 큼: {}",
            raw
        )));
    }

    Ok(Decimal::from_i128_with_scale(value as i128, decimals).normalize())
}
