//! 액션 스케줄러.
//!
//! 전이마다 `target = 전이 시각 + 보정 지연 (± 지터)`로 액션을 예약하고,
//! 폴링 루프가 `poll(now)`을 호출할 때 목표 시각과 전역 쿨다운을 모두 만족하면 발사한다.
//!
//! - 같은 종류의 대기 액션은 새 전이로 교체된다 (백로그 없음)
//! - 쿨다운은 종류와 무관한 전역 값
//! - 발사 실패는 경고 후 대기 액션을 버리며 쿨다운 시계를 갱신하지 않는다

use flicker_core::config::SchedulerConfig;
use flicker_core::models::symbol::ActionKind;
use flicker_core::models::transition::{ScheduledAction, TransitionEvent};
use flicker_core::ports::action_sink::ActionSink;
use flicker_timing::calibrator::DelayCalibrator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 한 번의 `poll` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 대기 액션 없음
    Idle,
    /// 목표 시각 전
    Waiting,
    /// 목표 시각은 지났으나 쿨다운 중
    Deferred { remaining: Duration },
    /// 발사 성공
    Fired(ActionKind),
    /// 발사 실패 (대기 액션 폐기)
    Failed(ActionKind),
}

/// 스케줄러 누적 카운터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub superseded: u64,
    pub fired: u64,
    pub fire_failures: u64,
    pub deferred_by_cooldown: u64,
}

pub struct ActionScheduler {
    sink: Arc<dyn ActionSink>,
    pending: HashMap<ActionKind, ScheduledAction>,
    last_fire: Option<Instant>,
    min_cooldown: Duration,
    jitter: Duration,
    stats: SchedulerStats,
}

impl ActionScheduler {
    pub fn new(sink: Arc<dyn ActionSink>, config: &SchedulerConfig) -> Self {
        Self {
            sink,
            pending: HashMap::new(),
            last_fire: None,
            min_cooldown: Duration::from_millis(config.min_cooldown_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            stats: SchedulerStats::default(),
        }
    }

    /// 전이에 대한 액션 예약. 같은 종류의 대기 액션이 있으면 교체한다.
    pub fn on_transition(
        &mut self,
        event: &TransitionEvent,
        action_kind: &ActionKind,
        calibrator: &DelayCalibrator,
    ) -> ScheduledAction {
        let delay = calibrator.estimate(action_kind);
        let target_time = self.apply_jitter(event.timestamp + delay, event.timestamp);
        let scheduled = ScheduledAction {
            target_time,
            action_kind: action_kind.clone(),
            event_timestamp: event.timestamp,
        };

        self.stats.scheduled += 1;
        if let Some(previous) = self.pending.insert(action_kind.clone(), scheduled.clone()) {
            self.stats.superseded += 1;
            let shift = target_time.saturating_duration_since(previous.target_time);
            debug!(
                kind = %action_kind,
                shift_ms = shift.as_millis() as u64,
                "대기 액션 교체"
            );
        }
        debug!(
            kind = %action_kind,
            delay_ms = delay.as_secs_f64() * 1000.0,
            "액션 예약"
        );
        scheduled
    }

    /// 균등 지터 적용 (전이 시각 이전으로는 당기지 않음)
    fn apply_jitter(&self, target: Instant, floor: Instant) -> Instant {
        if self.jitter.is_zero() {
            return target;
        }
        let span = self.jitter.as_micros() as f64;
        let offset = (rand::random::<f64>() * 2.0 - 1.0) * span;
        let shift = Duration::from_micros(offset.abs().round() as u64);
        if offset >= 0.0 {
            target + shift
        } else {
            target.checked_sub(shift).map_or(floor, |t| t.max(floor))
        }
    }

    /// 발사 조건 확인 후 최대 한 건 발사
    pub async fn poll(&mut self, now: Instant) -> PollOutcome {
        let due = self
            .pending
            .values()
            .filter(|a| a.target_time <= now)
            .min_by(|a, b| {
                a.target_time
                    .cmp(&b.target_time)
                    .then_with(|| a.action_kind.cmp(&b.action_kind))
            })
            .map(|a| a.action_kind.clone());

        let Some(kind) = due else {
            return if self.pending.is_empty() {
                PollOutcome::Idle
            } else {
                PollOutcome::Waiting
            };
        };

        if let Some(remaining) = self.cooldown_remaining(now) {
            self.stats.deferred_by_cooldown += 1;
            return PollOutcome::Deferred { remaining };
        }

        let Some(action) = self.pending.remove(&kind) else {
            return PollOutcome::Idle;
        };
        let late_ms = now.saturating_duration_since(action.target_time).as_secs_f64() * 1000.0;

        match self.sink.fire(&action.action_kind).await {
            Ok(()) => {
                self.last_fire = Some(now);
                self.stats.fired += 1;
                info!(kind = %action.action_kind, late_ms, sink = self.sink.name(), "액션 발사");
                PollOutcome::Fired(action.action_kind)
            }
            Err(e) => {
                self.stats.fire_failures += 1;
                warn!(kind = %action.action_kind, "액션 발사 실패, 대기 액션 폐기: {e}");
                PollOutcome::Failed(action.action_kind)
            }
        }
    }

    fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fire?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.min_cooldown).then(|| self.min_cooldown - elapsed)
    }

    /// 다음으로 무언가를 할 수 있는 시각 (쿨다운 종료 반영). 대기 액션이 없으면 None.
    pub fn next_deadline(&self) -> Option<Instant> {
        let earliest = self.pending.values().map(|a| a.target_time).min()?;
        let cooldown_end = self.last_fire.map(|t| t + self.min_cooldown);
        Some(match cooldown_end {
            Some(end) if end > earliest => end,
            _ => earliest,
        })
    }

    /// 대기 액션 모두 폐기 (일시정지 시)
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// 쿨다운 조정 (밀리초 단위 증감, 0 미만으로 내려가지 않음)
    pub fn adjust_cooldown(&mut self, delta_ms: i64) -> Duration {
        let current = self.min_cooldown.as_millis() as i64;
        let next = current.saturating_add(delta_ms).max(0) as u64;
        self.min_cooldown = Duration::from_millis(next);
        info!(cooldown_ms = next, "쿨다운 변경");
        self.min_cooldown
    }

    pub fn min_cooldown(&self) -> Duration {
        self.min_cooldown
    }

    pub fn pending(&self, kind: &ActionKind) -> Option<&ScheduledAction> {
        self.pending.get(kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}
