//! 도메인 모델.
//!
//! 입력 활동 이벤트와 알림 메시지 구조체.

pub mod activity;
pub mod alert;
