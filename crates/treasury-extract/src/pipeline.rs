//! 다단계 추출 파이프라인.
//!
//! 전략 순서는 고정입니다: 전문 패턴 스캔 → 구조적 추출 → 내장 JSON 마이닝.
//! 각 전략의 후보값은 [`FieldKind`] 검증 범위를 통과해야 하며, 범위를
//! 벗어나면 해당 전략의 실패로 기록하고 다음 전략으로 넘어갑니다.

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use thiserror::Error;
use treasury_core::TreasuryError;

use crate::field::{parse_scaled, FieldKind};

/// 전략 하나의 실패 기록.
#[derive(Debug, Clone)]
pub struct StrategyFailure {
    /// 전략 이름 (pattern / structural / embedded_json)
    pub strategy: &'static str,
    /// 실패 사유
    pub reason: String,
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

fn trail_summary(trail: &[StrategyFailure]) -> String {
    trail
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 추출 에러.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 잘못된 정규식 패턴 (설정 오류)
    #[error("잘못된 추출 패턴 '{pattern}': {reason}")]
    BadPattern { pattern: String, reason: String },

    /// 잘못된 CSS 셀렉터 (설정 오류)
    #[error("잘못된 셀렉터 '{selector}'")]
    BadSelector { selector: String },

    /// 모든 전략 소진 (전략별 실패 이력 포함)
    #[error("'{field}' 추출 실패: [{}]", trail_summary(.trail))]
    AllStrategiesFailed {
        field: String,
        trail: Vec<StrategyFailure>,
    },
}

impl From<ExtractError> for TreasuryError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::BadPattern { .. } | ExtractError::BadSelector { .. } => {
                TreasuryError::Config(err.to_string())
            }
            ExtractError::AllStrategiesFailed { .. } => {
                TreasuryError::Extraction(err.to_string())
            }
        }
    }
}

/// 추출 대상 필드 명세.
///
/// 전략별 소스(정규식 패턴, CSS 셀렉터, JSON 키)를 함께 선언합니다.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    patterns: Vec<Regex>,
    selectors: Vec<Selector>,
    json_keys: Vec<String>,
}

impl FieldSpec {
    /// 새 필드 명세 생성.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            patterns: Vec::new(),
            selectors: Vec::new(),
            json_keys: Vec::new(),
        }
    }

    /// 전문/구조적 추출에 사용할 정규식 패턴 추가.
    ///
    /// 첫 번째 캡처 그룹이 수치 후보가 됩니다.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ExtractError> {
        let re = Regex::new(pattern).map_err(|e| ExtractError::BadPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.patterns.push(re);
        Ok(self)
    }

    /// 구조적 추출에 사용할 CSS 셀렉터 추가.
    pub fn with_selector(mut self, selector: &str) -> Result<Self, ExtractError> {
        let sel = Selector::parse(selector).map_err(|_| ExtractError::BadSelector {
            selector: selector.to_string(),
        })?;
        self.selectors.push(sel);
        Ok(self)
    }

    /// 내장 JSON 마이닝에 사용할 키 추가.
    pub fn with_json_key(mut self, key: impl Into<String>) -> Self {
        self.json_keys.push(key.into());
        self
    }

    /// 필드 이름.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 필드 종류.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// 순서 고정 다단계 추출 파이프라인.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    field: FieldSpec,
}

impl ExtractionPipeline {
    /// 새 파이프라인 생성.
    pub fn new(field: FieldSpec) -> Self {
        Self { field }
    }

    /// 페이지 본문에서 필드 값을 추출합니다.
    ///
    /// # Errors
    ///
    /// 모든 전략이 실패하면 `AllStrategiesFailed`에 전략별 실패 이력을
    /// 담아 반환합니다.
    pub fn run(&self, body: &str) -> Result<Decimal, ExtractError> {
        let mut trail = Vec::new();

        match self.pattern_scan(body) {
            Ok(value) => {
                tracing::debug!(field = %self.field.name, strategy = "pattern", %value, "추출 성공");
                return Ok(value);
            }
            Err(reason) => trail.push(StrategyFailure {
                strategy: "pattern",
                reason,
            }),
        }

        let document = Html::parse_document(body);

        match self.structural(&document) {
            Ok(value) => {
                tracing::debug!(field = %self.field.name, strategy = "structural", %value, "추출 성공");
                return Ok(value);
            }
            Err(reason) => trail.push(StrategyFailure {
                strategy: "structural",
                reason,
            }),
        }

        match self.embedded_json(&document) {
            Ok(value) => {
                tracing::debug!(field = %self.field.name, strategy = "embedded_json", %value, "추출 성공");
                return Ok(value);
            }
            Err(reason) => trail.push(StrategyFailure {
                strategy: "embedded_json",
                reason,
            }),
        }

        Err(ExtractError::AllStrategiesFailed {
            field: self.field.name.clone(),
            trail,
        })
    }

    /// 후보값 검증. 범위를 벗어나면 사유 문자열을 반환합니다.
    fn validate(&self, value: Decimal) -> Result<Decimal, String> {
        if self.field.kind.validate(value) {
            Ok(value)
        } else {
            Err(format!("{} 범위 위반: {}", self.field.kind, value))
        }
    }

    /// 전략 1: 원문 전체에 대한 패턴 스캔.
    fn pattern_scan(&self, body: &str) -> Result<Decimal, String> {
        if self.field.patterns.is_empty() {
            return Err("패턴 미설정".to_string());
        }

        let mut reasons = Vec::new();
        for re in &self.field.patterns {
            let Some(caps) = re.captures(body) else {
                continue;
            };
            let Some(m) = caps.get(1) else {
                continue;
            };
            match parse_scaled(m.as_str()) {
                Some(candidate) => match self.validate(candidate) {
                    Ok(value) => return Ok(value),
                    Err(reason) => reasons.push(reason),
                },
                None => reasons.push(format!("수치 파싱 실패: '{}'", m.as_str())),
            }
        }

        if reasons.is_empty() {
            Err("일치하는 패턴 없음".to_string())
        } else {
            Err(reasons.join(", "))
        }
    }

    /// 전략 2: CSS 셀렉터 기반 구조적 추출.
    ///
    /// 셀렉터로 찾은 요소 텍스트에 필드 패턴을 다시 적용하고, 패턴이
    /// 맞지 않으면 요소 텍스트 자체를 수치로 파싱합니다.
    fn structural(&self, document: &Html) -> Result<Decimal, String> {
        if self.field.selectors.is_empty() {
            return Err("셀렉터 미설정".to_string());
        }

        let mut reasons = Vec::new();
        for selector in &self.field.selectors {
            for element in document.select(selector) {
                let text = element.text().collect::<String>();
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }

                let candidate = self
                    .field
                    .patterns
                    .iter()
                    .find_map(|re| {
                        re.captures(text)
                            .and_then(|caps| caps.get(1))
                            .and_then(|m| parse_scaled(m.as_str()))
                    })
                    .or_else(|| parse_scaled(text));

                match candidate {
                    Some(candidate) => match self.validate(candidate) {
                        Ok(value) => return Ok(value),
                        Err(reason) => reasons.push(reason),
                    },
                    None => reasons.push(format!("요소 텍스트 파싱 실패: '{}'", text)),
                }
            }
        }

        if reasons.is_empty() {
            Err("셀렉터에 일치하는 요소 없음".to_string())
        } else {
            Err(reasons.join(", "))
        }
    }

    /// 전략 3: `<script>` 태그 안의 JSON 블롭에서 키 기반 마이닝.
    fn embedded_json(&self, document: &Html) -> Result<Decimal, String> {
        if self.field.json_keys.is_empty() {
            return Err("JSON 키 미설정".to_string());
        }

        // script 셀렉터는 항상 유효한 리터럴
        let script_selector = Selector::parse("script")
            .map_err(|_| "script 셀렉터 파싱 실패".to_string())?;

        let mut reasons = Vec::new();
        for key in &self.field.json_keys {
            let pattern = format!(r#""?{}"?\s*[:=]\s*"?(-?[\d.]+)"?"#, regex::escape(key));
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(e) => {
                    reasons.push(format!("키 패턴 생성 실패 ({}): {}", key, e));
                    continue;
                }
            };

            for script in document.select(&script_selector) {
                let text = script.text().collect::<String>();
                for caps in re.captures_iter(&text) {
                    let Some(m) = caps.get(1) else { continue };
                    match parse_scaled(m.as_str()) {
                        Some(candidate) => match self.validate(candidate) {
                            Ok(value) => return Ok(value),
                            Err(reason) => reasons.push(reason),
                        },
                        None => reasons.push(format!("수치 파싱 실패: '{}'", m.as_str())),
                    }
                }
            }
        }

        if reasons.is_empty() {
            Err("스크립트에서 키를 찾지 못함".to_string())
        } else {
            Err(reasons.join(", "))
        }
    }
}
