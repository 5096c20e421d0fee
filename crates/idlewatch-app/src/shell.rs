//! 콘솔 트레이 셸.
//!
//! 트레이 메뉴 대신 터미널 한 줄 명령으로 설정/종료를 받는다.
//! 설정 대화상자는 같은 입력을 쓰므로 셸 스레드에서 그대로 실행하고,
//! 끝나면 메인 태스크에 [`ShellCommand::SettingsClosed`]를 보낸다.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::settings::{SettingsEditor, SettingsOutcome, SharedInput};

const HELP: &str = "명령: s(설정) 점심시간 설정, q(종료) 프로그램 종료, h 도움말";

/// 트레이 메뉴 항목
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    /// 설정 화면 열기
    OpenSettings,
    /// 앱 종료
    Exit,
    /// 명령 목록
    Help,
}

impl TrayAction {
    /// 입력 한 줄 해석. 빈 줄/모르는 명령은 None.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "s" | "settings" | "설정" => Some(Self::OpenSettings),
            "q" | "quit" | "exit" | "종료" => Some(Self::Exit),
            "h" | "?" | "help" | "도움말" => Some(Self::Help),
            _ => None,
        }
    }
}

/// 셸 → 메인 태스크
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// 설정 대화상자가 닫힘 (설정 다시 읽기)
    SettingsClosed,
    /// 종료 요청
    Exit,
}

/// 콘솔 셸
pub struct ConsoleShell {
    input: SharedInput,
    output: Box<dyn Write + Send>,
    editor: Arc<SettingsEditor>,
    commands: mpsc::UnboundedSender<ShellCommand>,
}

impl ConsoleShell {
    /// 새 셸 생성
    pub fn new(
        input: SharedInput,
        output: Box<dyn Write + Send>,
        editor: Arc<SettingsEditor>,
        commands: mpsc::UnboundedSender<ShellCommand>,
    ) -> Self {
        Self {
            input,
            output,
            editor,
            commands,
        }
    }

    /// 전용 스레드에서 실행
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("idlewatch-shell".into())
            .spawn(move || self.run())
    }

    /// 종료 명령, EOF, 수신측 종료 중 하나가 올 때까지 블로킹 실행
    pub fn run(mut self) {
        self.say(HELP);

        loop {
            let mut line = String::new();
            let read = self.input.lock().read_line(&mut line);
            match read {
                Ok(0) => {
                    debug!("콘솔 입력 종료, 셸 중지");
                    return;
                }
                Err(e) => {
                    warn!("콘솔 입력 읽기 실패, 셸 중지: {e}");
                    return;
                }
                Ok(_) => {}
            }

            match TrayAction::parse(&line) {
                Some(TrayAction::OpenSettings) => {
                    match self.editor.open() {
                        SettingsOutcome::AlreadyOpen => {
                            self.say("설정 창이 이미 열려 있습니다.");
                            continue;
                        }
                        outcome => debug!("설정 대화상자 닫힘: {:?}", outcome),
                    }
                    if self.commands.send(ShellCommand::SettingsClosed).is_err() {
                        return;
                    }
                }
                Some(TrayAction::Exit) => {
                    info!("사용자 종료 요청");
                    let _ = self.commands.send(ShellCommand::Exit);
                    return;
                }
                Some(TrayAction::Help) => self.say(HELP),
                None if line.trim().is_empty() => {}
                None => self.say(&format!("알 수 없는 명령: {}. {HELP}", line.trim())),
            }
        }
    }

    fn say(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
        let _ = self.output.flush();
    }
}
