//! 타이머 태스크.
//!
//! [`InactivityTimer`]를 단독 소유하는 tokio 태스크. 입력 채널, 다음 기상 시각,
//! 발송 결과 채널, 종료 신호를 한 `select!` 루프에서 직렬로 처리하므로
//! 상태에 락이 필요 없다. 메일 발송은 별도 태스크에서 실행하고 결과만 돌려받는다.

use idlewatch_core::models::activity::ActivityKind;
use idlewatch_core::ports::clock::Clock;
use idlewatch_core::ports::config::ConfigProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::inactivity_timer::{
    ActivityOutcome, Dispatch, ExpiryOutcome, InactivityTimer, SendOutcome,
};
use crate::notifier::{collect_alert_context, AlertNotifier, NotifyError};

/// 발송 태스크 → 타이머 태스크 결과 보고
#[derive(Debug)]
struct SendReport {
    episode: u64,
    result: Result<(), NotifyError>,
}

/// 타이머 태스크
pub struct TimerTask {
    timer: InactivityTimer,
    config: Arc<dyn ConfigProvider>,
    clock: Arc<dyn Clock>,
    notifier: Arc<AlertNotifier>,
    activity_rx: mpsc::Receiver<ActivityKind>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TimerTask {
    /// 새 타이머 태스크 (생성 시각 기준으로 대기 시작)
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        clock: Arc<dyn Clock>,
        notifier: Arc<AlertNotifier>,
        activity_rx: mpsc::Receiver<ActivityKind>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let timer = InactivityTimer::new(config.clone(), clock.now());
        Self {
            timer,
            config,
            clock,
            notifier,
            activity_rx,
            shutdown_rx,
        }
    }

    /// 다음 기상까지 남은 시간 (대기 중인 마감이 없으면 None)
    fn time_until_wake(&self) -> Option<Duration> {
        let wake = self.timer.next_wake()?;
        Some((wake - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// 종료 신호까지 실행
    pub async fn run(mut self) {
        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<SendReport>();
        let mut in_flight: Option<JoinHandle<()>> = None;

        if let Some(wait) = self.time_until_wake() {
            info!("비활동 타이머 시작: {}초 후 확인", wait.as_secs());
        }

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let wait = self.time_until_wake();
            let sleep = async move {
                match wait {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                Some(report) = report_rx.recv() => {
                    in_flight = None;
                    self.handle_report(report);
                }

                kind = self.activity_rx.recv() => match kind {
                    Some(kind) => self.handle_activity(kind),
                    None => {
                        error!("활동 입력 채널 닫힘, 감시 중지");
                        break;
                    }
                },

                _ = sleep => {
                    if let Some(dispatch) = self.handle_expiry() {
                        in_flight = Some(self.spawn_send(dispatch, report_tx.clone()));
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            handle.abort();
            debug!("진행 중인 알림 발송 취소");
        }
        info!("비활동 타이머 종료");
    }

    fn handle_activity(&mut self, kind: ActivityKind) {
        match self.timer.on_activity(self.clock.now()) {
            ActivityOutcome::Ignored => trace!("점심시간, 입력 무시: {:?}", kind),
            ActivityOutcome::Reset {
                cleared_alert: true,
            } => info!("활동 감지, 알림 상태 초기화"),
            ActivityOutcome::Reset {
                cleared_alert: false,
            } => trace!("활동 감지, 마감 재설정: {:?}", kind),
        }
    }

    fn handle_expiry(&mut self) -> Option<Dispatch> {
        match self.timer.on_deadline_expiry(self.clock.now()) {
            ExpiryOutcome::NotDue => None,
            ExpiryOutcome::Deferred => {
                info!("점심시간, 알림 보류. 임계값 후 다시 확인");
                None
            }
            ExpiryOutcome::AlreadySent => None,
            ExpiryOutcome::Dispatch(dispatch) => Some(dispatch),
        }
    }

    fn spawn_send(
        &self,
        dispatch: Dispatch,
        report_tx: mpsc::UnboundedSender<SendReport>,
    ) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let config = self.config.current();
        let ctx = collect_alert_context(dispatch.idle_minutes, dispatch.at);

        tokio::spawn(async move {
            let result = notifier.send(&config, &ctx).await;
            let _ = report_tx.send(SendReport {
                episode: dispatch.episode,
                result,
            });
        })
    }

    fn handle_report(&mut self, report: SendReport) {
        let delivered = report.result.is_ok();
        match self
            .timer
            .on_send_result(report.episode, delivered, self.clock.now())
        {
            SendOutcome::Committed => debug!("알림 발송 확정 (구간 {})", report.episode),
            SendOutcome::Rearmed => {
                if let Err(e) = &report.result {
                    error!("알림 미발송, 다음 주기에 재시도: {e}");
                }
            }
            SendOutcome::Stale => debug!("이전 구간의 발송 결과 무시 (구간 {})", report.episode),
        }
    }
}
