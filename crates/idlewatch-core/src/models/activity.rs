//! 입력 활동 모델.

use serde::{Deserialize, Serialize};

/// 유휴 타이머를 리셋하는 입력 종류 (내용은 수집하지 않음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    /// 마우스 이동
    PointerMove,
    /// 마우스 버튼 클릭
    PointerClick,
    /// 휠 스크롤
    PointerScroll,
    /// 키 누름
    KeyPress,
}
