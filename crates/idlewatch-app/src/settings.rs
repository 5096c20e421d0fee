//! 점심시간 설정 편집.
//!
//! 대화상자 포트([`SettingsDialog`])로 현재 값을 보여 주고, 검증을 통과한 값만
//! [`ConfigManager`]에 저장한다. 검증 실패 시 사용자에게 알리고 이전 설정을 유지한다.

use chrono::NaiveTime;
use idlewatch_core::config::WatchdogConfig;
use idlewatch_core::config_manager::ConfigManager;
use idlewatch_core::lunch::MAX_LUNCH_WINDOW_MINUTES;
use parking_lot::Mutex;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// 편집 대상 (점심시간 필드만 노출)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LunchSettingsForm {
    /// 점심시간 일시정지 사용
    pub enabled: bool,
    /// 시작 (HH:MM)
    pub start: String,
    /// 종료 (HH:MM)
    pub end: String,
}

impl LunchSettingsForm {
    /// 현재 설정에서 폼 생성
    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self {
            enabled: config.lunch_enabled,
            start: config.lunch_start.clone(),
            end: config.lunch_end.clone(),
        }
    }

    /// 폼 값을 설정에 반영
    pub fn apply_to(&self, config: &mut WatchdogConfig) {
        config.lunch_enabled = self.enabled;
        config.lunch_start = self.start.trim().to_string();
        config.lunch_end = self.end.trim().to_string();
    }
}

/// 설정 검증/저장 에러
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("시간 형식은 HH:MM 이어야 합니다 (예: 12:30). {field}: {value:?}")]
    InvalidTimeFormat { field: &'static str, value: String },

    #[error("점심시간은 자정을 넘을 수 없습니다 ({start}~{end})")]
    CrossesMidnight { start: String, end: String },

    #[error("점심시간은 2시간을 넘을 수 없습니다 (입력: {minutes}분)")]
    WindowTooLong { minutes: i64 },

    #[error("설정 저장 실패: {0}")]
    Persist(String),
}

fn parse_strict(field: &'static str, value: &str) -> Result<NaiveTime, SettingsError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        SettingsError::InvalidTimeFormat {
            field,
            value: value.to_string(),
        }
    })
}

/// 점심시간 폼 검증
///
/// 사용 여부와 상관없이 두 시각은 항상 검증한다 (나중에 켰을 때 바로 쓰이므로).
pub fn validate_lunch_form(form: &LunchSettingsForm) -> Result<(), SettingsError> {
    let start = parse_strict("시작", &form.start)?;
    let end = parse_strict("종료", &form.end)?;

    if end < start {
        return Err(SettingsError::CrossesMidnight {
            start: form.start.trim().to_string(),
            end: form.end.trim().to_string(),
        });
    }

    let minutes = (end - start).num_minutes();
    if minutes > MAX_LUNCH_WINDOW_MINUTES {
        return Err(SettingsError::WindowTooLong { minutes });
    }

    Ok(())
}

/// 설정 대화상자 포트
pub trait SettingsDialog: Send + Sync {
    /// 폼 표시. 저장이면 편집된 값, 취소면 None.
    fn edit(&self, current: &LunchSettingsForm) -> Option<LunchSettingsForm>;

    /// 오류 표시
    fn show_error(&self, title: &str, message: &str);

    /// 안내 표시
    fn show_info(&self, title: &str, message: &str);
}

/// 편집 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOutcome {
    /// 저장됨
    Saved,
    /// 사용자가 취소
    Cancelled,
    /// 검증/저장 실패 (설정 유지)
    Rejected(SettingsError),
    /// 이미 열려 있음
    AlreadyOpen,
}

/// 설정 편집기
pub struct SettingsEditor {
    config: ConfigManager,
    dialog: Arc<dyn SettingsDialog>,
    open: AtomicBool,
}

impl SettingsEditor {
    /// 새 편집기 생성
    pub fn new(config: ConfigManager, dialog: Arc<dyn SettingsDialog>) -> Self {
        Self {
            config,
            dialog,
            open: AtomicBool::new(false),
        }
    }

    /// 대화상자 열기 → 검증 → 저장. 동시에 하나만 열린다.
    pub fn open(&self) -> SettingsOutcome {
        if self.open.swap(true, Ordering::AcqRel) {
            return SettingsOutcome::AlreadyOpen;
        }
        let outcome = self.run_dialog();
        self.open.store(false, Ordering::Release);
        outcome
    }

    fn run_dialog(&self) -> SettingsOutcome {
        let current = LunchSettingsForm::from_config(&self.config.get());
        let Some(form) = self.dialog.edit(&current) else {
            return SettingsOutcome::Cancelled;
        };

        if let Err(e) = validate_lunch_form(&form) {
            warn!("점심시간 설정 거부: {e}");
            self.dialog.show_error("입력 오류", &e.to_string());
            return SettingsOutcome::Rejected(e);
        }

        if let Err(e) = self.config.update_with(|c| form.apply_to(c)) {
            let err = SettingsError::Persist(e.to_string());
            self.dialog.show_error("저장 실패", &err.to_string());
            return SettingsOutcome::Rejected(err);
        }

        info!(
            "점심시간 설정 저장: 사용={}, {}~{}",
            form.enabled,
            form.start.trim(),
            form.end.trim()
        );
        self.dialog.show_info("저장됨", "점심시간 설정을 저장했습니다.");
        SettingsOutcome::Saved
    }
}

/// 셸과 대화상자가 함께 쓰는 줄 입력 (버퍼를 하나만 두기 위해 공유)
pub type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// 표준 입력을 공유 입력으로 감싼다
pub fn stdin_input() -> SharedInput {
    shared_input(std::io::BufReader::new(std::io::stdin()))
}

/// 임의 리더를 공유 입력으로 감싼다
pub fn shared_input(reader: impl BufRead + Send + 'static) -> SharedInput {
    Arc::new(Mutex::new(Box::new(reader)))
}

/// 터미널 대화상자
///
/// 빈 입력은 현재 값 유지, `c`는 취소.
pub struct ConsoleSettingsDialog {
    input: SharedInput,
    output: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSettingsDialog {
    /// 공유 입력 + 표준 출력 사용
    pub fn stdio(input: SharedInput) -> Self {
        Self::new(input, Box::new(std::io::stdout()))
    }

    /// 임의 입출력 사용
    pub fn new(input: SharedInput, output: Box<dyn Write + Send>) -> Self {
        Self {
            input,
            output: Mutex::new(output),
        }
    }

    /// 질문 후 한 줄 읽기. EOF 또는 `c`는 None.
    fn ask(&self, prompt: &str) -> Option<String> {
        {
            let mut out = self.output.lock();
            let _ = write!(out, "{prompt}");
            let _ = out.flush();
        }
        let mut line = String::new();
        match self.input.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim().to_string();
                (!answer.eq_ignore_ascii_case("c")).then_some(answer)
            }
        }
    }

    fn say(&self, text: &str) {
        let mut out = self.output.lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

/// 예/아니오 해석. 빈 입력은 `Some(None)` (현재 값 유지), 모르는 답은 None.
fn parse_yes_no(answer: &str) -> Option<Option<bool>> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(None),
        "y" | "yes" | "예" => Some(Some(true)),
        "n" | "no" | "아니오" => Some(Some(false)),
        _ => None,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "예"
    } else {
        "아니오"
    }
}

impl SettingsDialog for ConsoleSettingsDialog {
    fn edit(&self, current: &LunchSettingsForm) -> Option<LunchSettingsForm> {
        self.say("── 점심시간 설정 (빈 입력: 유지, c: 취소) ──");

        let enabled = loop {
            let answer = self.ask(&format!(
                "점심시간 동안 감시 일시정지 [y/n] (현재: {}): ",
                yes_no(current.enabled)
            ))?;
            match parse_yes_no(&answer) {
                Some(value) => break value.unwrap_or(current.enabled),
                None => self.say("y 또는 n 으로 답해 주세요."),
            }
        };

        let start = self.ask(&format!("시작 HH:MM [{}]: ", current.start))?;
        let end = self.ask(&format!("종료 HH:MM [{}]: ", current.end))?;

        Some(LunchSettingsForm {
            enabled,
            start: if start.is_empty() { current.start.clone() } else { start },
            end: if end.is_empty() { current.end.clone() } else { end },
        })
    }

    fn show_error(&self, title: &str, message: &str) {
        self.say(&format!("[{title}] {message}"));
    }

    fn show_info(&self, title: &str, message: &str) {
        self.say(&format!("[{title}] {message}"));
    }
}
