//! 메일 전송 포트.
//!
//! 구현: `idlewatch-network` crate (lettre SMTP)

use async_trait::async_trait;

use crate::config::WatchdogConfig;
use crate::error::CoreError;
use crate::models::alert::AlertMessage;

/// 메일 전송 인터페이스
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 설정의 SMTP 서버/계정으로 메시지 한 통 전송
    async fn send(&self, config: &WatchdogConfig, message: &AlertMessage)
        -> Result<(), CoreError>;
}
