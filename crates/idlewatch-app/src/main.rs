//! # idlewatch
//!
//! 데스크톱 비활동 감시 바이너리 진입점.
//! 설정 로드, 입력 후킹, 타이머 태스크, 콘솔 셸 연결과 종료 처리.

use anyhow::{anyhow, Context, Result};
use idlewatch_app::lifecycle::LifecycleManager;
use idlewatch_app::notifier::AlertNotifier;
use idlewatch_app::settings::{stdin_input, ConsoleSettingsDialog, SettingsEditor};
use idlewatch_app::shell::{ConsoleShell, ShellCommand};
use idlewatch_app::timer_task::TimerTask;
use idlewatch_core::config_manager::ConfigManager;
use idlewatch_core::ports::clock::SystemClock;
use idlewatch_monitor::input_hook::{InputHook, ACTIVITY_CHANNEL_CAPACITY};
use idlewatch_network::SmtpMailer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// RUST_LOG 미설정 시 기본 필터
const DEFAULT_LOG_FILTER: &str =
    "idlewatch=info,idlewatch_app=info,idlewatch_core=info,idlewatch_monitor=info,idlewatch_network=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("IDLEWATCH v{} 시작", env!("CARGO_PKG_VERSION"));

    let config_manager = ConfigManager::new().context("설정 파일 준비 실패")?;
    let config = config_manager.get();
    info!(
        "설정 로드: {} (임계값 {}분, 점심시간 {} {}~{})",
        config_manager.config_path().display(),
        config.idle_timeout_minutes,
        if config.lunch_enabled { "사용" } else { "미사용" },
        config.lunch_start,
        config.lunch_end
    );
    if config.recipients.normalized().is_empty() {
        warn!("수신자가 비어 있음. 알림을 보내려면 config.json의 email_destinatario를 채우세요");
    }

    let lifecycle = LifecycleManager::new();

    // 입력 후킹 실패는 감시 자체가 불가능하므로 종료
    let (activity_tx, activity_rx) = mpsc::channel(ACTIVITY_CHANNEL_CAPACITY);
    let mut hook = InputHook::start(activity_tx).context("입력 감지를 시작할 수 없음")?;

    let notifier = Arc::new(AlertNotifier::new(Arc::new(SmtpMailer::new())));
    let timer = TimerTask::new(
        Arc::new(config_manager.clone()),
        Arc::new(SystemClock),
        notifier,
        activity_rx,
        lifecycle.subscribe(),
    );
    let timer_handle = tokio::spawn(timer.run());

    let (shell_tx, mut shell_rx) = mpsc::unbounded_channel();
    let input = stdin_input();
    let dialog = Arc::new(ConsoleSettingsDialog::stdio(input.clone()));
    let editor = Arc::new(SettingsEditor::new(config_manager.clone(), dialog));
    ConsoleShell::new(input, Box::new(std::io::stdout()), editor, shell_tx)
        .spawn()
        .context("콘솔 셸 시작 실패")?;

    let mut hook_failure = None;
    loop {
        tokio::select! {
            _ = lifecycle.wait_for_signal() => break,

            // 입력 훅이 죽으면 감시도 끝낸다
            reason = hook.failed() => {
                error!("입력 감지 중단, 종료: {reason}");
                hook_failure = Some(reason);
                break;
            }

            Some(cmd) = shell_rx.recv() => match cmd {
                ShellCommand::SettingsClosed => {
                    if let Err(e) = config_manager.reload() {
                        error!("설정 다시 읽기 실패: {e}");
                    }
                }
                ShellCommand::Exit => break,
            },
        }
    }

    lifecycle.shutdown();
    hook.stop();
    if let Err(e) = timer_handle.await {
        error!("타이머 태스크 비정상 종료: {e}");
    }

    if let Some(reason) = hook_failure {
        return Err(anyhow!("입력 감지 중단: {reason}"));
    }

    info!("IDLEWATCH 종료");
    Ok(())
}
