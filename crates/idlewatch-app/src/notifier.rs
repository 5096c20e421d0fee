//! 비활동 알림 발송.
//!
//! 고정 템플릿으로 메일을 만들어 [`MailTransport`] 포트로 보낸다.
//! 중복 발송 방지는 타이머 상태 머신이 담당하고, 여기서는 한 번의 발송만 책임진다.

use chrono::{DateTime, Local};
use idlewatch_core::config::WatchdogConfig;
use idlewatch_core::error::CoreError;
use idlewatch_core::models::alert::{AlertContext, AlertMessage};
use idlewatch_core::ports::mailer::MailTransport;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// 사용자/호스트를 알 수 없을 때 표기
const UNKNOWN: &str = "N/A";

/// 알림 시각 표기 형식
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// 알림 발송 에러
#[derive(Debug, Error)]
pub enum NotifyError {
    /// 수신자가 비어 있음 (전송 시도 안 함)
    #[error("수신자가 설정되지 않음 (config.json의 email_destinatario 확인)")]
    NoRecipientsConfigured,

    /// 전송 실패
    #[error("메일 전송 실패: {0}")]
    SendFailed(#[source] CoreError),
}

/// 현재 사용자/호스트로 알림 상황 정보 구성
pub fn collect_alert_context(idle_minutes: u32, timestamp: DateTime<Local>) -> AlertContext {
    AlertContext {
        user: current_user(),
        host: sysinfo::System::host_name().unwrap_or_else(|| UNKNOWN.to_string()),
        idle_minutes,
        timestamp,
    }
}

fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// 알림 제목
pub fn alert_subject(ctx: &AlertContext) -> String {
    format!("비활동 알림: {} @ {}", ctx.user, ctx.host)
}

/// 알림 본문
pub fn alert_body(ctx: &AlertContext) -> String {
    format!(
        "주의,\n\
         자동으로 발송된 알림입니다.\n\
         \n\
         - 사용자: {}\n\
         - 컴퓨터: {}\n\
         - 비활동 시간: {}분 초과\n\
         - 알림 시각: {}\n",
        ctx.user,
        ctx.host,
        ctx.idle_minutes,
        ctx.timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// 알림 발송기
pub struct AlertNotifier {
    transport: Arc<dyn MailTransport>,
}

impl AlertNotifier {
    /// 새 발송기 생성
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// 메시지 구성. 수신자가 없으면 에러.
    pub fn compose(
        config: &WatchdogConfig,
        ctx: &AlertContext,
    ) -> Result<AlertMessage, NotifyError> {
        let to = config.recipients.normalized();
        if to.is_empty() {
            return Err(NotifyError::NoRecipientsConfigured);
        }

        Ok(AlertMessage {
            from: config.sender_email.clone(),
            to,
            subject: alert_subject(ctx),
            body: alert_body(ctx),
        })
    }

    /// 알림 한 통 발송
    pub async fn send(&self, config: &WatchdogConfig, ctx: &AlertContext) -> Result<(), NotifyError> {
        warn!("비활동 감지: 사용자 '{}' ({}), 알림 메일 준비", ctx.user, ctx.host);

        let message = match Self::compose(config, ctx) {
            Ok(message) => message,
            Err(e) => {
                error!("{e}");
                return Err(e);
            }
        };

        match self.transport.send(config, &message).await {
            Ok(()) => {
                info!("알림 메일 발송 완료: {}", message.to.join(", "));
                Ok(())
            }
            Err(e) => {
                error!("알림 메일 발송 실패: {e}");
                Err(NotifyError::SendFailed(e))
            }
        }
    }
}
