//! 라이프사이클 관리.
//!
//! 종료 신호 전파와 OS 시그널 대기.

use tokio::sync::watch;
use tracing::{error, info};

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    /// 새 라이프사이클 관리자 생성
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// 종료 수신기 복제
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 종료 신호 발송 (여러 번 호출해도 한 번만 기록)
    pub fn shutdown(&self) {
        let sent = self.shutdown_tx.send_if_modified(|down| {
            let first = !*down;
            *down = true;
            first
        });
        if sent {
            info!("종료 신호 발송");
        }
    }

    /// 종료 신호가 이미 발송됐는지
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM)
    ///
    /// 핸들러 등록에 실패하면 시그널 없이 영원히 대기한다 (셸의 종료 명령은 계속 동작).
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let (mut sigint, mut sigterm) =
                match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                    (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                    (Err(e), _) | (_, Err(e)) => {
                        error!("시그널 핸들러 등록 실패: {e}");
                        return std::future::pending().await;
                    }
                };

            tokio::select! {
                _ = sigint.recv() => {
                    info!("SIGINT 수신");
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM 수신");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Ctrl+C 핸들러 등록 실패: {e}");
                return std::future::pending().await;
            }
            info!("Ctrl+C 수신");
        }

        self.shutdown();
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
