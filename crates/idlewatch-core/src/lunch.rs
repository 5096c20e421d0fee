//! 점심시간 창 판정.
//!
//! 현재 시각이 설정된 점심시간 안에 있으면 유휴 감시를 멈춘다.
//! 자정을 넘는 창(종료 < 시작)은 감싸지 않는다. 이런 창은 설정 저장 단계에서 거부된다.

use chrono::{NaiveTime, Timelike};
use tracing::warn;

/// 설정 화면에서 허용하는 최대 점심시간 길이 (분)
pub const MAX_LUNCH_WINDOW_MINUTES: i64 = 120;

/// 점심시간 창 (설정에서 파생, 판정할 때마다 해석)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LunchWindow<'a> {
    /// 시작 시각 문자열
    pub start: &'a str,
    /// 종료 시각 문자열
    pub end: &'a str,
    /// 활성화 여부
    pub enabled: bool,
}

impl LunchWindow<'_> {
    /// 시작/종료 파싱. 하나라도 형식이 틀리면 `None`.
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_time_of_day(self.start)?, parse_time_of_day(self.end)?))
    }

    /// 창 길이. 형식 오류거나 자정을 넘으면 `None`.
    pub fn duration(&self) -> Option<chrono::Duration> {
        let (start, end) = self.bounds()?;
        (end >= start).then(|| end - start)
    }
}

/// `HH:MM` (또는 `HH:MM:SS`) 파싱
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// 현재 시각이 점심시간 창 안에 있는지 판정 (양 끝 포함)
///
/// 형식 오류는 "점심시간 아님"으로 처리하고 경고만 남긴다.
pub fn is_suppressed(now: NaiveTime, window: &LunchWindow<'_>) -> bool {
    if !window.enabled {
        return false;
    }

    let Some((start, end)) = window.bounds() else {
        warn!(
            "점심시간 형식 오류, 감시 계속: 시작={:?}, 종료={:?}",
            window.start, window.end
        );
        return false;
    };

    if end < start {
        warn!(
            "자정을 넘는 점심시간은 지원하지 않음, 감시 계속: {}~{}",
            window.start, window.end
        );
        return false;
    }

    // 나노초 이하 차이로 종료 경계가 흔들리지 않도록 초 단위로 자른다
    let now = now.with_nanosecond(0).unwrap_or(now);
    start <= now && now <= end
}
