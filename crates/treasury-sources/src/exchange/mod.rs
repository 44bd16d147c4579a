//! HMAC 서명 거래소 API 어댑터 (조회 전용).
//!
//! 주문/출금 등 쓰기 계열 작업은 다루지 않습니다.

pub mod binance;
pub mod btse;
