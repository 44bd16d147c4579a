//! 표시 타임존 변환.
//!
//! API는 에포크 밀리초(UTC)를 주고받지만, 저장소의 날짜/시각 컬럼과
//! 날짜 기반 중복 키는 작업별 표시 타임존(기본 GMT+7)으로 기록합니다.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::TimestampMs;

/// 기본 표시 타임존 (GMT+7).
pub const DEFAULT_DISPLAY_TZ: Tz = chrono_tz::Asia::Bangkok;

/// 에포크 밀리초를 표시 타임존의 (날짜, 시각) 문자열로 변환합니다.
///
/// 날짜는 `YYYY-MM-DD`, 시각은 `HH:MM:SS` 형식입니다.
/// 범위를 벗어난 타임스탬프는 None을 반환합니다.
pub fn to_zone_parts(timestamp_ms: TimestampMs, tz: Tz) -> Option<(String, String)> {
    let utc = Utc.timestamp_millis_opt(timestamp_ms).single()?;
    let local = utc.with_timezone(&tz);
    Some((
        local.format("%Y-%m-%d").to_string(),
        local.format("%H:%M:%S").to_string(),
    ))
}

/// 에포크 밀리초를 표시 타임존의 날짜 키(`YYYY-MM-DD`)로 변환합니다.
pub fn date_key(timestamp_ms: TimestampMs, tz: Tz) -> Option<String> {
    to_zone_parts(timestamp_ms, tz).map(|(date, _)| date)
}

/// 현재 시각의 표시 타임존 날짜 키.
pub fn today_key(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// 현재 시각 (에포크 밀리초).
pub fn now_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}
