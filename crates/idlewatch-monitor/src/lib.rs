//! # idlewatch-monitor
//!
//! 입력 활동 감지 어댑터.
//! 전역 마우스/키보드 훅(rdev)에서 받은 이벤트를 활동 채널로 전달한다.

pub mod input_hook;
