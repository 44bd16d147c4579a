//! # Treasury Sources
//!
//! 자산 데이터 소스 어댑터 모음.
//!
//! - REST 공개 API (볼트 트렌드 등)
//! - HMAC 서명 거래소 API (조회 전용)
//! - 온체인 ERC-20/ERC-4626 조회 (raw `eth_call`)

pub mod chain;
pub mod exchange;
pub mod rest;

pub use chain::{parse_address, ChainReader, DEFAULT_RPC_TIMEOUT_SECS};
pub use exchange::binance::{BinanceConfig, BinanceReader};
pub use exchange::btse::{BtseConfig, BtseReader};
pub use rest::{RestSource, TrendQuery, TrendRecord};
