//! # idlewatch-network
//!
//! 네트워크 어댑터.
//! [`MailTransport`](idlewatch_core::ports::mailer::MailTransport) 포트를
//! lettre SMTP(STARTTLS + 인증)로 구현한다.

pub mod smtp;

pub use smtp::SmtpMailer;
