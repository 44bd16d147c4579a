//! # Treasury Store
//!
//! 추가 전용(append-only) 표 형태 저장소와 중복 키 계층.
//!
//! 저장소는 트랜잭션도 고유성 제약도 제공하지 않습니다. 멱등성은
//! [`DedupKeyStore`]가 키 컬럼 스캔과 첫 빈 행 추가로 보장합니다
//! (단일 작성자 가정).

pub mod dedup;
pub mod memory;
pub mod rtdb;
pub mod sheets;
pub mod tabular;

pub use dedup::{DedupKeyStore, WriteSegment};
pub use memory::InMemoryStore;
pub use rtdb::{EventRecord, RtdbStore};
pub use sheets::{ServiceAccountKey, SheetsStore, TokenSource};
pub use tabular::{col_to_index, index_to_col, offset_col, TabularStore};
