//! 설정 조회 포트.
//!
//! 구현: [`crate::config_manager::ConfigManager`]

use crate::config::WatchdogConfig;

/// 판단 시점마다 최신 설정을 읽기 위한 인터페이스.
///
/// 타이머와 알림기는 값을 캐시하지 않고 전이마다 이 포트를 호출한다.
pub trait ConfigProvider: Send + Sync {
    /// 현재 설정 (복제본)
    fn current(&self) -> WatchdogConfig;
}
