//! SMTP 메일 전송 어댑터.
//!
//! 설정의 서버/포트로 STARTTLS 업그레이드 후 발신 계정으로 인증하고 전송한다.
//! 전송할 때마다 설정을 새로 읽으므로 연결은 재사용하지 않는다.

use async_trait::async_trait;
use idlewatch_core::config::WatchdogConfig;
use idlewatch_core::error::CoreError;
use idlewatch_core::models::alert::AlertMessage;
use idlewatch_core::ports::mailer::MailTransport;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// SMTP 응답 대기 시간
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP 어댑터 에러
#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("주소 파싱 실패: {address}")]
    ParseAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("수신자 없음")]
    NoRecipients,
    #[error("메시지 생성 실패")]
    BuildMessage(#[source] lettre::error::Error),
    #[error("SMTP 연결 설정 실패: {0}")]
    BuildTransport(#[source] lettre::transport::smtp::Error),
    #[error("SMTP 전송 실패: {0}")]
    Send(#[source] lettre::transport::smtp::Error),
}

impl From<SmtpError> for CoreError {
    fn from(e: SmtpError) -> Self {
        CoreError::Mail(e.to_string())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SmtpError> {
    address.parse().map_err(|source| SmtpError::ParseAddress {
        address: address.to_string(),
        source,
    })
}

/// [`AlertMessage`] → lettre 메시지 (text/plain, 전체 수신자 To)
pub fn build_message(message: &AlertMessage) -> Result<Message, SmtpError> {
    if message.to.is_empty() {
        return Err(SmtpError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &message.to {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(message.body.clone())
        .map_err(SmtpError::BuildMessage)
}

/// STARTTLS 릴레이 + 계정 인증 트랜스포트
fn build_transport(
    config: &WatchdogConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(SmtpError::BuildTransport)?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.sender_email.clone(),
            config.sender_password.clone(),
        ))
        .timeout(Some(SMTP_TIMEOUT))
        .build();
    Ok(transport)
}

/// lettre 기반 메일 전송기
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    /// 새 전송기 생성
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(
        &self,
        config: &WatchdogConfig,
        message: &AlertMessage,
    ) -> Result<(), CoreError> {
        let email = build_message(message)?;
        let transport = build_transport(config)?;

        debug!(
            "SMTP 전송 시작: {}:{} (수신자 {}명)",
            config.smtp_host,
            config.smtp_port,
            message.to.len()
        );
        let response = transport.send(email).await.map_err(SmtpError::Send)?;
        info!("SMTP 전송 완료: 응답 코드 {}", response.code());
        Ok(())
    }
}
