//! 전역 입력 훅.
//!
//! rdev 리스너를 전용 스레드에서 실행하고, 입력이 있을 때마다
//! [`ActivityKind`]를 채널로 보낸다. 훅 콜백은 락을 잡지 않고 `try_send`만 한다.
//! 채널이 가득 찼다는 것은 아직 처리되지 않은 활동이 있다는 뜻이므로 버려도 된다.

use idlewatch_core::error::CoreError;
use idlewatch_core::models::activity::ActivityKind;
use rdev::EventType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// 리스너가 곧바로 실패하는지 기다리는 시간
const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// 활동 채널 권장 용량
pub const ACTIVITY_CHANNEL_CAPACITY: usize = 64;

/// rdev 이벤트 → 활동 종류. 해제(release) 이벤트는 무시한다.
pub fn classify(event_type: &EventType) -> Option<ActivityKind> {
    match event_type {
        EventType::MouseMove { .. } => Some(ActivityKind::PointerMove),
        EventType::ButtonPress(_) => Some(ActivityKind::PointerClick),
        EventType::Wheel { .. } => Some(ActivityKind::PointerScroll),
        EventType::KeyPress(_) => Some(ActivityKind::KeyPress),
        EventType::KeyRelease(_) | EventType::ButtonRelease(_) => None,
    }
}

/// 훅 스레드에서 타이머 태스크로 활동을 넘기는 전달자
#[derive(Debug, Clone)]
pub struct ActivityForwarder {
    tx: mpsc::Sender<ActivityKind>,
    active: Arc<AtomicBool>,
}

impl ActivityForwarder {
    /// 새 전달자 생성
    pub fn new(tx: mpsc::Sender<ActivityKind>) -> Self {
        Self {
            tx,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 활동 전달. 수신 측이 닫혔으면 이후 호출은 무시된다.
    pub fn forward(&self, kind: ActivityKind) {
        if !self.active.load(Ordering::Relaxed) {
            return;
        }
        match self.tx.try_send(kind) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("활동 채널 닫힘, 전달 중지");
                self.active.store(false, Ordering::Relaxed);
            }
        }
    }

    /// 전달 중지
    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// 전달 중인지 여부
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// 실행 중인 입력 훅 핸들
///
/// rdev 리스너 자체는 중단 API가 없으므로 `stop()`은 전달만 끊는다.
/// 스레드는 프로세스 종료와 함께 정리된다. 핸들은 채널 송신자를 들고 있지 않으므로
/// 리스너 스레드가 끝나면 활동 채널도 닫힌다.
#[derive(Debug)]
pub struct InputHookHandle {
    active: Arc<AtomicBool>,
    failure: Option<oneshot::Receiver<String>>,
}

impl InputHookHandle {
    /// 활동 전달 중지
    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
        info!("입력 훅 전달 중지");
    }

    /// 훅이 아직 활동을 전달하는지 여부
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// 리스너 스레드가 시작 이후에 죽을 때까지 대기, 사유 반환
    ///
    /// 취소해도 안전하다. 한 번 사유를 돌려준 뒤에는 영원히 대기한다.
    pub async fn failed(&mut self) -> String {
        let Some(rx) = self.failure.as_mut() else {
            return std::future::pending().await;
        };
        let reason = rx
            .await
            .unwrap_or_else(|_| "리스너 스레드가 사유 없이 종료됨".to_string());
        self.failure = None;
        reason
    }
}

impl Drop for InputHookHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

/// 전역 입력 훅
pub struct InputHook;

impl InputHook {
    /// 리스너 스레드 시작
    ///
    /// 훅을 설치할 수 없으면 (디스플레이 없음, 접근성 권한 없음 등)
    /// [`CoreError::InputHookUnavailable`]을 반환한다. 활동 감지 없이는
    /// 워치독이 동작할 수 없으므로 호출자는 이를 시작 실패로 처리해야 하고,
    /// 시작 이후의 중단은 [`InputHookHandle::failed`]로 받아야 한다.
    pub fn start(tx: mpsc::Sender<ActivityKind>) -> Result<InputHookHandle, CoreError> {
        supervise(tx, STARTUP_GRACE, |forwarder| {
            rdev::listen(move |event| {
                if let Some(kind) = classify(&event.event_type) {
                    forwarder.forward(kind);
                }
            })
            .map_err(|e| format!("{e:?}"))
        })
    }
}

/// 리스너를 전용 스레드에서 돌리고 시작 유예 시간 안의 실패를 에러로 돌려준다.
fn supervise<L>(
    tx: mpsc::Sender<ActivityKind>,
    grace: Duration,
    listen: L,
) -> Result<InputHookHandle, CoreError>
where
    L: FnOnce(ActivityForwarder) -> Result<(), String> + Send + 'static,
{
    let forwarder = ActivityForwarder::new(tx);
    let active = forwarder.active.clone();
    let (startup_tx, startup_rx) = std::sync::mpsc::channel::<String>();
    let (failure_tx, failure_rx) = oneshot::channel::<String>();

    std::thread::Builder::new()
        .name("idlewatch-input-hook".to_string())
        .spawn(move || {
            let stop_flag = forwarder.active.clone();
            let reason = match listen(forwarder) {
                Ok(()) => "리스너가 예기치 않게 종료됨".to_string(),
                Err(e) => e,
            };
            stop_flag.store(false, Ordering::Relaxed);
            error!("입력 훅 종료: {}", reason);
            // 시작 확인 중이면 startup 쪽이, 이후라면 핸들 쪽이 받는다
            let _ = startup_tx.send(reason.clone());
            let _ = failure_tx.send(reason);
        })
        .map_err(|e| CoreError::InputHookUnavailable(format!("스레드 생성 실패: {e}")))?;

    match startup_rx.recv_timeout(grace) {
        Ok(reason) => Err(CoreError::InputHookUnavailable(reason)),
        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
            info!("입력 훅 시작 (마우스 이동/클릭/스크롤, 키 입력)");
            Ok(InputHookHandle {
                active,
                failure: Some(failure_rx),
            })
        }
        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
            warn!("입력 훅 스레드가 사유 없이 종료됨");
            Err(CoreError::InputHookUnavailable(
                "리스너 스레드 종료".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{Button, Key};

    #[test]
    fn classify_press_events() {
        assert_eq!(
            classify(&EventType::MouseMove { x: 1.0, y: 2.0 }),
            Some(ActivityKind::PointerMove)
        );
        assert_eq!(
            classify(&EventType::ButtonPress(Button::Left)),
            Some(ActivityKind::PointerClick)
        );
        assert_eq!(
            classify(&EventType::Wheel {
                delta_x: 0,
                delta_y: -1
            }),
            Some(ActivityKind::PointerScroll)
        );
        assert_eq!(
            classify(&EventType::KeyPress(Key::KeyA)),
            Some(ActivityKind::KeyPress)
        );
    }

    #[test]
    fn classify_ignores_releases() {
        assert_eq!(classify(&EventType::KeyRelease(Key::KeyA)), None);
        assert_eq!(classify(&EventType::ButtonRelease(Button::Right)), None);
    }

    #[test]
    fn forwarder_delivers_activity() {
        let (tx, mut rx) = mpsc::channel(4);
        let forwarder = ActivityForwarder::new(tx);
        forwarder.forward(ActivityKind::KeyPress);
        assert_eq!(rx.try_recv().unwrap(), ActivityKind::KeyPress);
    }

    #[test]
    fn forwarder_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let forwarder = ActivityForwarder::new(tx);
        forwarder.forward(ActivityKind::PointerMove);
        forwarder.forward(ActivityKind::PointerClick);
        assert!(forwarder.is_active());
        assert_eq!(rx.try_recv().unwrap(), ActivityKind::PointerMove);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn forwarder_stops_after_receiver_closed() {
        let (tx, rx) = mpsc::channel(1);
        let forwarder = ActivityForwarder::new(tx);
        drop(rx);
        forwarder.forward(ActivityKind::KeyPress);
        assert!(!forwarder.is_active());
    }

    #[test]
    fn stopped_forwarder_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let forwarder = ActivityForwarder::new(tx);
        forwarder.stop();
        forwarder.forward(ActivityKind::KeyPress);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn immediate_listener_failure_is_unavailable() {
        let (tx, _rx) = mpsc::channel(4);
        let result = supervise(tx, Duration::from_secs(5), |_forwarder| {
            Err("디스플레이 없음".to_string())
        });
        match result {
            Err(CoreError::InputHookUnavailable(reason)) => assert_eq!(reason, "디스플레이 없음"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn listener_death_after_startup_is_reported() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut handle = supervise(tx, Duration::from_millis(20), |forwarder| {
            forwarder.forward(ActivityKind::KeyPress);
            std::thread::sleep(Duration::from_millis(100));
            Err("X 서버 연결 끊김".to_string())
        })
        .unwrap();
        assert!(handle.is_running());

        let reason = tokio::time::timeout(Duration::from_secs(5), handle.failed())
            .await
            .unwrap();
        assert_eq!(reason, "X 서버 연결 끊김");
        assert!(!handle.is_running());

        // 스레드의 송신자가 사라지면 채널이 닫힌다
        assert_eq!(rx.recv().await, Some(ActivityKind::KeyPress));
        assert_eq!(rx.recv().await, None);
    }
}
