//! # idlewatch-app
//!
//! 비활동 감시 오케스트레이션: 타이머 상태 머신과 구동 태스크, 알림 발송,
//! 점심시간 설정 편집, 콘솔 셸, 라이프사이클.

pub mod inactivity_timer;
pub mod lifecycle;
pub mod notifier;
pub mod settings;
pub mod shell;
pub mod timer_task;
