//! 설정 파일 관리.
//!
//! 작업 디렉토리의 `config.json`을 로드/저장한다.
//! 파일이 없거나 깨졌으면 기본값으로 다시 만들고, 키가 빠졌으면 기본값으로 채워 저장한다.

use crate::config::WatchdogConfig;
use crate::error::CoreError;
use crate::ports::config::ConfigProvider;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 설정 파일 이름 (작업 디렉토리 기준)
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 설정 파일의 로드/저장 및 런타임 설정 변경을 관리한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 설정 (스레드 안전)
    config: Arc<RwLock<WatchdogConfig>>,
    /// 설정 파일 경로
    config_path: PathBuf,
}

/// 파일을 읽은 결과
enum Loaded {
    /// 정상 (누락 키 보충 여부, 기본값으로 되돌린 키 포함)
    Ok {
        config: WatchdogConfig,
        merged: bool,
        repaired: Vec<String>,
    },
    /// 파일 없음
    Missing,
    /// 파싱 불가 (사유)
    Malformed(String),
}

impl ConfigManager {
    /// 작업 디렉토리의 `config.json`으로 설정 관리자 생성
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(PathBuf::from(CONFIG_FILE_NAME))
    }

    /// 지정된 경로로 설정 관리자 생성
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        let config = Self::load_or_create(&config_path)?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// 현재 설정 반환 (복제본)
    pub fn get(&self) -> WatchdogConfig {
        self.config.read().clone()
    }

    /// 설정 업데이트 및 파일 저장
    pub fn update(&self, new_config: WatchdogConfig) -> Result<(), CoreError> {
        // 파일이 먼저 — 저장 실패 시 메모리 값도 유지
        Self::save_to_file(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!("설정 저장 완료: {}", self.config_path.display());
        Ok(())
    }

    /// 특정 필드만 업데이트
    pub fn update_with<F>(&self, updater: F) -> Result<WatchdogConfig, CoreError>
    where
        F: FnOnce(&mut WatchdogConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 설정 다시 로드 (파일 복구 규칙 동일 적용)
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = Self::load_or_create(&self.config_path)?;
        *self.config.write() = config;
        info!("설정 다시 로드 완료");
        Ok(())
    }

    /// 로드, 실패 시 기본값 생성
    fn load_or_create(path: &Path) -> Result<WatchdogConfig, CoreError> {
        match Self::load_from_file(path)? {
            Loaded::Ok {
                config,
                merged,
                repaired,
            } => {
                if !repaired.is_empty() {
                    warn!(
                        "잘못된 설정 값을 기본값으로 교체: {}: {}",
                        path.display(),
                        repaired.join(", ")
                    );
                    Self::backup_repaired(path);
                }
                if merged || !repaired.is_empty() {
                    Self::save_to_file(path, &config)?;
                }
                if merged {
                    info!("누락된 설정 키를 기본값으로 보충: {}", path.display());
                }
                Ok(config)
            }
            Loaded::Missing => {
                let default_config = WatchdogConfig::default_config();
                Self::save_to_file(path, &default_config)?;
                info!("기본 설정 파일 생성: {}", path.display());
                Ok(default_config)
            }
            Loaded::Malformed(reason) => {
                warn!(
                    "설정 파일 손상, 기본값으로 재생성: {}: {}",
                    path.display(),
                    reason
                );
                Self::backup_malformed(path);
                let default_config = WatchdogConfig::default_config();
                Self::save_to_file(path, &default_config)?;
                Ok(default_config)
            }
        }
    }

    /// 파일에서 설정 로드 + 누락 키 병합
    fn load_from_file(path: &Path) -> Result<Loaded, CoreError> {
        // 바이트로 읽어 UTF-8 오류도 JSON 파싱 오류로 취급한다
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(e) => {
                return Err(CoreError::Config(format!(
                    "설정 파일 읽기 실패: {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut document = match serde_json::from_slice::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Ok(Loaded::Malformed("최상위가 객체가 아님".to_string())),
            Err(e) => return Ok(Loaded::Malformed(e.to_string())),
        };

        let defaults = WatchdogConfig::default_document();
        let merged = merge_missing_keys(&mut document, defaults.clone());
        let repaired = repair_invalid_fields(&mut document, &defaults);

        match serde_json::from_value::<WatchdogConfig>(Value::Object(document)) {
            Ok(config) => {
                debug!("설정 파일 로드 완료: {}", path.display());
                Ok(Loaded::Ok {
                    config,
                    merged,
                    repaired,
                })
            }
            Err(e) => Ok(Loaded::Malformed(e.to_string())),
        }
    }

    /// 손상된 파일을 `.bak`으로 보존 (실패해도 진행)
    fn backup_malformed(path: &Path) {
        let backup = backup_path_for(path);
        match fs::rename(path, &backup) {
            Ok(()) => info!("손상된 설정 파일 보존: {}", backup.display()),
            Err(e) => warn!("손상된 설정 파일 보존 실패: {}", e),
        }
    }

    /// 일부 값만 교체할 때 원본을 `.bak`으로 복사 (실패해도 진행)
    fn backup_repaired(path: &Path) {
        let backup = backup_path_for(path);
        if let Err(e) = fs::copy(path, &backup) {
            warn!("원본 설정 파일 보존 실패: {}", e);
        }
    }

    /// 파일에 설정 저장 (임시 파일 기록 후 rename)
    fn save_to_file(path: &Path, config: &WatchdogConfig) -> Result<(), CoreError> {
        let content = to_pretty_json(config)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tmp_path = temp_path_for(path);
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            Ok(())
        };

        if let Err(e) = write_tmp().and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CoreError::Config(format!(
                "설정 파일 저장 실패: {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }
}

impl ConfigProvider for ConfigManager {
    fn current(&self) -> WatchdogConfig {
        self.get()
    }
}

/// 기본 문서에 있고 대상에 없는 키를 채운다. 하나라도 채웠으면 true.
fn merge_missing_keys(document: &mut Map<String, Value>, defaults: Map<String, Value>) -> bool {
    let mut merged = false;
    for (key, value) in defaults {
        if !document.contains_key(&key) {
            debug!("설정 키 보충: {key}");
            document.insert(key, value);
            merged = true;
        }
    }
    merged
}

/// 타입이 맞지 않는 필드만 기본값으로 되돌린다. 되돌린 키 목록 반환.
///
/// 필드마다 기본 문서에 그 값 하나만 넣어 역직렬화해 보고 실패한 키를 찾는다.
fn repair_invalid_fields(
    document: &mut Map<String, Value>,
    defaults: &Map<String, Value>,
) -> Vec<String> {
    if serde_json::from_value::<WatchdogConfig>(Value::Object(document.clone())).is_ok() {
        return Vec::new();
    }

    let mut repaired = Vec::new();
    for (key, default) in defaults {
        let Some(value) = document.get(key) else {
            continue;
        };
        let mut candidate = defaults.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<WatchdogConfig>(Value::Object(candidate)).is_err() {
            document.insert(key.clone(), default.clone());
            repaired.push(key.clone());
        }
    }
    repaired
}

/// `config.json` → `config.json.bak`
fn backup_path_for(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

/// 같은 디렉토리의 임시 파일 경로 (rename이 원자적이도록)
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}

/// 4칸 들여쓰기 JSON (손으로 편집하기 쉬운 형태)
fn to_pretty_json(config: &WatchdogConfig) -> Result<String, CoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| CoreError::Internal(format!("UTF-8 변환 실패: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Recipients;
    use tempfile::TempDir;

    fn config_path(dir: &TempDir) -> PathBuf {
        dir.path().join(CONFIG_FILE_NAME)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn create_default_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        assert!(path.exists());
        assert_eq!(manager.get(), WatchdogConfig::default_config());

        let doc = read_json(&path);
        assert_eq!(doc["tempo_limite_minutos"], 20);
        assert_eq!(doc["servidor_smtp"], "smtp.gmail.com");
    }

    #[test]
    fn malformed_file_is_replaced_and_backed_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        fs::write(&path, "{ isto não é json").unwrap();

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        assert_eq!(manager.get(), WatchdogConfig::default_config());
        assert_eq!(read_json(&path)["porta_smtp"], 587);

        let backup = temp_dir.path().join("config.json.bak");
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            "{ isto não é json"
        );
    }

    #[test]
    fn non_object_document_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        fs::write(&path, "[1, 2, 3]").unwrap();

        let manager = ConfigManager::with_path(path).unwrap();
        assert_eq!(manager.get(), WatchdogConfig::default_config());
    }

    #[test]
    fn invalid_utf8_file_is_replaced_and_backed_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        let raw: &[u8] = b"{\"tempo_limite_minutos\": 5, \"x\": \"\xff\xfe\"}";
        fs::write(&path, raw).unwrap();

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        assert_eq!(manager.get(), WatchdogConfig::default_config());
        assert_eq!(read_json(&path)["tempo_limite_minutos"], 20);

        let backup = temp_dir.path().join("config.json.bak");
        assert_eq!(fs::read(backup).unwrap(), raw);
    }

    #[test]
    fn wrong_field_type_falls_back_for_that_field_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        let original = r#"{"tempo_limite_minutos": "vinte", "porta_smtp": "587", "email_remetente": "eu@example.com", "email_destinatario": ["chefe@example.com"], "servidor_smtp": "smtp.example.com"}"#;
        fs::write(&path, original).unwrap();

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        let config = manager.get();
        assert_eq!(config.idle_timeout_minutes, 20);
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.sender_email, "eu@example.com");
        assert_eq!(config.smtp_host, "smtp.example.com");
        assert_eq!(config.recipients.normalized(), vec!["chefe@example.com"]);

        let doc = read_json(&path);
        assert_eq!(doc["porta_smtp"], 587);
        assert_eq!(doc["tempo_limite_minutos"], 20);
        assert_eq!(doc["email_remetente"], "eu@example.com");

        // 원본은 .bak으로 복사만 한다
        let backup = temp_dir.path().join("config.json.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), original);
    }

    #[test]
    fn missing_keys_are_backfilled_and_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        fs::write(
            &path,
            r#"{"tempo_limite_minutos": 5, "email_destinatario": "single@example.com", "apelido": "recepcao"}"#,
        )
        .unwrap();

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        let config = manager.get();
        assert_eq!(config.idle_timeout_minutes, 5);
        assert_eq!(
            config.recipients,
            Recipients::Single("single@example.com".into())
        );
        assert_eq!(config.smtp_port, 587);

        let doc = read_json(&path);
        assert_eq!(doc["tempo_limite_minutos"], 5);
        assert_eq!(doc["almoco_inicio"], "13:00");
        assert_eq!(doc["almoco_ativado"], true);
        // 알 수 없는 키는 버리지 않는다
        assert_eq!(doc["apelido"], "recepcao");
        // 단일 문자열 형태 유지
        assert_eq!(doc["email_destinatario"], "single@example.com");
    }

    #[test]
    fn complete_file_is_not_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        ConfigManager::with_path(path.clone()).unwrap();

        // 포맷만 다른 완전한 문서
        let compact = serde_json::to_string(&WatchdogConfig::default_config()).unwrap();
        fs::write(&path, &compact).unwrap();

        ConfigManager::with_path(path.clone()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), compact);
    }

    #[test]
    fn save_of_load_preserves_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        fs::write(
            &path,
            r#"{"tempo_limite_minutos": 7, "notas": {"a": [1, 2]}, "email_destinatario": ["x@example.com"]}"#,
        )
        .unwrap();

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        let before = read_json(&path);
        manager.update(manager.get()).unwrap();
        assert_eq!(read_json(&path), before);
    }

    #[test]
    fn update_and_persist_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        let manager = ConfigManager::with_path(path.clone()).unwrap();

        manager
            .update_with(|c| {
                c.lunch_start = "12:00".into();
                c.lunch_end = "13:30".into();
                c.lunch_enabled = false;
            })
            .unwrap();

        let manager2 = ConfigManager::with_path(path).unwrap();
        let config = manager2.get();
        assert_eq!(config.lunch_start, "12:00");
        assert_eq!(config.lunch_end, "13:30");
        assert!(!config.lunch_enabled);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        let manager = ConfigManager::with_path(path).unwrap();
        manager.update_with(|c| c.idle_timeout_minutes = 3).unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![CONFIG_FILE_NAME.to_string()]);
    }

    #[test]
    fn saved_file_uses_four_space_indent() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        ConfigManager::with_path(path.clone()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n    \"tempo_limite_minutos\": 20"));
    }

    #[test]
    fn reload_picks_up_external_edit() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(&temp_dir);
        let manager = ConfigManager::with_path(path.clone()).unwrap();

        let mut doc = read_json(&path);
        doc["tempo_limite_minutos"] = Value::from(45);
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        manager.reload().unwrap();
        assert_eq!(manager.current().idle_timeout_minutes, 45);
    }
}
