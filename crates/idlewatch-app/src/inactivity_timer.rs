//! 비활동 타이머 상태 머신.
//!
//! 시각을 인자로 받는 순수 상태 머신이다. 실제 대기와 채널 처리는
//! [`crate::timer_task`]가 맡는다. 임계값과 점심시간은 전이마다
//! [`ConfigProvider`]에서 새로 읽는다.
//!
//! ```text
//! Armed ─expiry─▶ Dispatching ─성공─▶ AlertSent
//!   ▲  ▲              │ 실패              │
//!   │  └──────────────┘                   │
//!   └──────────── activity ◀──────────────┘
//! Armed/Suspended ─expiry (점심시간)─▶ Suspended
//! ```

use chrono::{DateTime, Local};
use idlewatch_core::lunch;
use idlewatch_core::ports::config::ConfigProvider;
use std::sync::Arc;

/// 타이머 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// 마감 시각까지 입력이 없으면 알림
    Armed { deadline: DateTime<Local> },
    /// 점심시간이라 보류, 마감 시각에 다시 확인
    Suspended { deadline: DateTime<Local> },
    /// 알림 발송 중 (결과 대기)
    Dispatching,
    /// 이번 유휴 구간의 알림 발송 완료
    AlertSent { sent_at: DateTime<Local> },
}

/// 입력 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// 점심시간이라 무시
    Ignored,
    /// 마감 시각 재설정
    Reset {
        /// 알림 발송 상태였다가 해제되었는지
        cleared_alert: bool,
    },
}

/// 알림 발송 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// 유휴 구간 번호 (결과 매칭용)
    pub episode: u64,
    /// 알림 당시 설정된 임계값 (분)
    pub idle_minutes: u32,
    /// 알림 시각
    pub at: DateTime<Local>,
}

/// 마감 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// 아직 마감 전이거나 대기 중인 마감이 없음
    NotDue,
    /// 점심시간, 새 마감으로 재설정
    Deferred,
    /// 이미 알림을 보낸 구간
    AlreadySent,
    /// 알림 발송 필요
    Dispatch(Dispatch),
}

/// 발송 결과 반영
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 발송 성공, 다음 입력까지 알림 없음
    Committed,
    /// 발송 실패, 임계값 한 주기 후 재시도
    Rearmed,
    /// 발송 중 입력이 있어 이미 다음 구간으로 넘어감
    Stale,
}

/// 비활동 타이머
pub struct InactivityTimer {
    config: Arc<dyn ConfigProvider>,
    state: TimerState,
    episode: u64,
}

impl InactivityTimer {
    /// 새 타이머 (`now + 임계값`으로 대기 시작)
    pub fn new(config: Arc<dyn ConfigProvider>, now: DateTime<Local>) -> Self {
        let deadline = now + config.current().idle_timeout();
        Self {
            config,
            state: TimerState::Armed { deadline },
            episode: 0,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// 현재 유휴 구간 번호
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// 다음에 깨어나야 할 시각
    pub fn next_wake(&self) -> Option<DateTime<Local>> {
        match self.state {
            TimerState::Armed { deadline } | TimerState::Suspended { deadline } => Some(deadline),
            TimerState::Dispatching | TimerState::AlertSent { .. } => None,
        }
    }

    fn is_lunch_time(&self, now: DateTime<Local>) -> bool {
        let config = self.config.current();
        lunch::is_suppressed(now.time(), &config.lunch_window())
    }

    fn fresh_deadline(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + self.config.current().idle_timeout()
    }

    /// 입력 발생
    pub fn on_activity(&mut self, now: DateTime<Local>) -> ActivityOutcome {
        if self.is_lunch_time(now) {
            return ActivityOutcome::Ignored;
        }

        let cleared_alert = matches!(
            self.state,
            TimerState::AlertSent { .. } | TimerState::Dispatching
        );
        self.episode += 1;
        self.state = TimerState::Armed {
            deadline: self.fresh_deadline(now),
        };
        ActivityOutcome::Reset { cleared_alert }
    }

    /// 마감 시각 도달
    ///
    /// 점심시간 판정은 마감을 설정한 시점이 아니라 지금 시각으로 한다.
    pub fn on_deadline_expiry(&mut self, now: DateTime<Local>) -> ExpiryOutcome {
        let deadline = match self.state {
            TimerState::AlertSent { .. } => return ExpiryOutcome::AlreadySent,
            TimerState::Dispatching => return ExpiryOutcome::NotDue,
            TimerState::Armed { deadline } | TimerState::Suspended { deadline } => deadline,
        };
        if now < deadline {
            return ExpiryOutcome::NotDue;
        }

        if self.is_lunch_time(now) {
            self.state = TimerState::Suspended {
                deadline: self.fresh_deadline(now),
            };
            return ExpiryOutcome::Deferred;
        }

        self.state = TimerState::Dispatching;
        ExpiryOutcome::Dispatch(Dispatch {
            episode: self.episode,
            idle_minutes: self.config.current().idle_timeout_minutes,
            at: now,
        })
    }

    /// 발송 결과 반영
    pub fn on_send_result(
        &mut self,
        episode: u64,
        delivered: bool,
        now: DateTime<Local>,
    ) -> SendOutcome {
        if episode != self.episode || self.state != TimerState::Dispatching {
            return SendOutcome::Stale;
        }

        if delivered {
            self.state = TimerState::AlertSent { sent_at: now };
            SendOutcome::Committed
        } else {
            self.state = TimerState::Armed {
                deadline: self.fresh_deadline(now),
            };
            SendOutcome::Rearmed
        }
    }
}
