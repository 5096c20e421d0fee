//! 시계 포트.

use chrono::{DateTime, Local};

/// 벽시계 시각 공급자
pub trait Clock: Send + Sync {
    /// 현재 로컬 시각
    fn now(&self) -> DateTime<Local>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
