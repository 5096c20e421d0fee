//! 설정 및 DI 와이어링 통합 테스트.
//!
//! config.json → ConfigManager → 타이머/알림/설정 편집기 연결 검증.

use chrono::Local;
use idlewatch_app::notifier::{collect_alert_context, AlertNotifier};
use idlewatch_app::settings::{validate_lunch_form, LunchSettingsForm};
use idlewatch_core::config::WatchdogConfig;
use idlewatch_core::config_manager::ConfigManager;
use idlewatch_core::ports::config::ConfigProvider;
use idlewatch_network::SmtpMailer;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn config_defaults_are_valid() {
    let config = WatchdogConfig::default_config();

    assert!(config.idle_timeout_minutes > 0);
    assert_eq!(config.idle_timeout().num_minutes(), config.idle_timeout_minutes as i64);
    assert!(config.smtp_port > 0);
    assert!(!config.smtp_host.is_empty());

    // 기본 점심시간은 편집기 검증도 통과해야 한다
    let form = LunchSettingsForm::from_config(&config);
    assert_eq!(validate_lunch_form(&form), Ok(()));
}

#[test]
fn first_run_writes_document_with_persisted_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let _manager = ConfigManager::with_path(path.clone()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
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
        assert!(doc.get(key).is_some(), "누락된 키: {key}");
    }
}

#[test]
fn hand_edited_file_is_visible_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = ConfigManager::with_path(path.clone()).unwrap();
    let provider: Arc<dyn ConfigProvider> = Arc::new(manager.clone());

    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    doc["tempo_limite_minutos"] = serde_json::json!(45);
    doc["email_destinatario"] = serde_json::json!("gerencia@example.com");
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    manager.reload().unwrap();

    let current = provider.current();
    assert_eq!(current.idle_timeout_minutes, 45);
    assert_eq!(current.recipients.normalized(), vec!["gerencia@example.com"]);
}

#[test]
fn notifier_composes_from_loaded_config() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("config.json")).unwrap();
    let config = manager.get();

    let _notifier = AlertNotifier::new(Arc::new(SmtpMailer::new()));
    let ctx = collect_alert_context(config.idle_timeout_minutes, Local::now());
    match AlertNotifier::compose(&config, &ctx) {
        Ok(message) => {
            assert_eq!(message.from, config.sender_email);
            assert_eq!(message.to, config.recipients.normalized());
        }
        Err(e) => assert!(config.recipients.normalized().is_empty(), "{e}"),
    }
}
