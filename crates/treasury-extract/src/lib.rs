//! # Treasury Extract
//!
//! 렌더링된 페이지에서 수치 필드를 추출하는 다단계 파이프라인.
//!
//! 전략은 순서대로 시도됩니다:
//! 1. 전문(full-text) 패턴 스캔 (regex)
//! 2. 구조적 추출 (CSS 셀렉터)
//! 3. 내장 JSON 마이닝 (`<script>` 태그 내부)
//!
//! 각 전략의 후보값은 필드별 검증 범위를 통과해야 하며, 실패하면
//! 다음 전략으로 넘어갑니다. 모든 전략이 실패하면 전략별 실패 이력이
//! 담긴 에러를 반환합니다.

pub mod address;
pub mod field;
pub mod pipeline;

pub use address::find_contract_address;
pub use field::{parse_numeric, parse_scaled, FieldKind};
pub use pipeline::{ExtractError, ExtractionPipeline, FieldSpec, StrategyFailure};
