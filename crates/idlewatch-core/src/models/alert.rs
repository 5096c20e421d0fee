//! 비활동 알림 모델.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 알림 본문에 들어가는 상황 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContext {
    /// 로그인 사용자
    pub user: String,
    /// 호스트명
    pub host: String,
    /// 설정된 유휴 임계값 (분)
    pub idle_minutes: u32,
    /// 알림 시각
    pub timestamp: DateTime<Local>,
}

/// 전송할 메일 한 통
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    /// 발신 주소
    pub from: String,
    /// 수신 주소 (하나 이상)
    pub to: Vec<String>,
    /// 제목
    pub subject: String,
    /// 본문 (text/plain)
    pub body: String,
}
