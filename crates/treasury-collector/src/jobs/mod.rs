//! 동기화 작업 모듈.
//!
//! 각 작업은 하나의 원천에서 레코드를 가져와 오케스트레이터를
//! 통해 반영하고 `SyncStats`를 돌려줍니다.

pub mod chain_position;
pub mod exchange_balance;
pub mod exchange_flow;
pub mod vault_trend;

pub use chain_position::sync_chain_position;
pub use exchange_balance::sync_exchange_balances;
pub use exchange_flow::sync_exchange_flows;
pub use vault_trend::sync_vault_trend;

/// 등록된 작업 이름 목록.
pub const JOB_NAMES: [&str; 4] = [
    "vault-trend",
    "chain-position",
    "exchange-balance",
    "exchange-flow",
];
