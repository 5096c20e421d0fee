//! 워치독 설정 구조체.
//!
//! 유휴 임계값, SMTP 발신 계정, 수신자 목록, 점심시간 창을 정의한다.
//! 파일 키 이름은 기존 배포본의 `config.json`과 호환되도록 그대로 유지한다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lunch::LunchWindow;

/// 유휴 임계값 기본값 (분)
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: u32 = 20;

/// SMTP 기본 포트 (STARTTLS submission)
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// 최상위 워치독 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// 알림 전 허용되는 무입력 시간 (분)
    #[serde(rename = "tempo_limite_minutos")]
    pub idle_timeout_minutes: u32,
    /// 발신 계정 (SMTP 로그인 ID 겸 From 주소)
    #[serde(rename = "email_remetente")]
    pub sender_email: String,
    /// 발신 계정 앱 비밀번호
    #[serde(rename = "senha_remetente")]
    pub sender_password: String,
    /// 수신자 (단일 문자열 또는 목록)
    #[serde(rename = "email_destinatario")]
    pub recipients: Recipients,
    /// SMTP 서버 호스트
    #[serde(rename = "servidor_smtp")]
    pub smtp_host: String,
    /// SMTP 서버 포트
    #[serde(rename = "porta_smtp")]
    pub smtp_port: u16,
    /// 점심시간 시작 (HH:MM)
    #[serde(rename = "almoco_inicio")]
    pub lunch_start: String,
    /// 점심시간 종료 (HH:MM)
    #[serde(rename = "almoco_fim")]
    pub lunch_end: String,
    /// 점심시간 동안 모니터링 일시정지 여부
    #[serde(rename = "almoco_ativado")]
    pub lunch_enabled: bool,
    /// 알 수 없는 추가 키 (사용자가 직접 넣은 값 보존)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WatchdogConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            idle_timeout_minutes: DEFAULT_IDLE_TIMEOUT_MINUTES,
            sender_email: "seu-email-remetente".to_string(),
            sender_password: "sua-senha-de-app".to_string(),
            recipients: Recipients::List(vec![
                "destinatario_01@gmail.com".to_string(),
                "destinatario_02@gmail.com".to_string(),
            ]),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            lunch_start: "13:00".to_string(),
            lunch_end: "14:00".to_string(),
            lunch_enabled: true,
            extra: Map::new(),
        }
    }

    /// 기본 설정의 JSON 문서 형태 (누락 키 보충용)
    pub fn default_document() -> Map<String, Value> {
        match serde_json::to_value(Self::default_config()) {
            Ok(Value::Object(map)) => map,
            // 구조체는 항상 객체로 직렬화된다
            _ => Map::new(),
        }
    }

    /// 유휴 임계값 (0분은 1분으로 보정)
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.idle_timeout_minutes.max(1)))
    }

    /// 점심시간 창 뷰
    pub fn lunch_window(&self) -> LunchWindow<'_> {
        LunchWindow {
            start: &self.lunch_start,
            end: &self.lunch_end,
            enabled: self.lunch_enabled,
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

/// 수신자 설정.
///
/// 손으로 편집한 파일에서는 주소 하나를 문자열로 적는 경우가 많아 두 형태를 모두 받는다.
/// 저장 시에는 읽은 형태 그대로 다시 쓴다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    /// `"a@example.com"`
    Single(String),
    /// `["a@example.com", "b@example.com"]`
    List(Vec<String>),
}

impl Recipients {
    /// 순서를 유지한 수신자 목록 (공백 항목 제외)
    pub fn normalized(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Recipients::Single(addr) => vec![addr.as_str()],
            Recipients::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::List(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run_document() {
        let config = WatchdogConfig::default_config();
        assert_eq!(config.idle_timeout_minutes, 20);
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.lunch_start, "13:00");
        assert_eq!(config.lunch_end, "14:00");
        assert!(config.lunch_enabled);
        assert_eq!(config.recipients.normalized().len(), 2);
    }

    #[test]
    fn default_document_uses_persisted_key_names() {
        let doc = WatchdogConfig::default_document();
        for key in [
            "tempo_limite_minutos",
            "email_remetente",
            "senha_remetente",
            "email_destinatario",
            "servidor_smtp",
            "porta_smtp",
            "almoco_inicio",
            "almoco_fim",
            "almoco_ativado",
        ] {
            assert!(doc.contains_key(key), "누락된 키: {key}");
        }
        assert_eq!(doc.len(), 9);
    }

    #[test]
    fn bare_string_recipient_normalizes_to_single_entry() {
        let json = r#""single@example.com""#;
        let recipients: Recipients = serde_json::from_str(json).unwrap();
        assert_eq!(recipients, Recipients::Single("single@example.com".into()));
        assert_eq!(recipients.normalized(), vec!["single@example.com"]);
    }

    #[test]
    fn blank_recipients_are_dropped() {
        let recipients = Recipients::List(vec![
            " a@example.com ".into(),
            "".into(),
            "   ".into(),
            "b@example.com".into(),
        ]);
        assert_eq!(
            recipients.normalized(),
            vec!["a@example.com", "b@example.com"]
        );
        assert!(Recipients::Single(String::new()).normalized().is_empty());
    }

    #[test]
    fn extra_keys_survive_roundtrip() {
        let mut doc = WatchdogConfig::default_document();
        doc.insert("observacao".into(), Value::String("manter".into()));
        let config: WatchdogConfig = serde_json::from_value(Value::Object(doc)).unwrap();
        assert_eq!(
            config.extra.get("observacao"),
            Some(&Value::String("manter".into()))
        );

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["observacao"], "manter");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = WatchdogConfig {
            idle_timeout_minutes: 0,
            ..WatchdogConfig::default_config()
        };
        assert_eq!(config.idle_timeout(), chrono::Duration::minutes(1));
    }
}
