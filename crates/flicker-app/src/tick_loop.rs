//! 폴링 루프.
//!
//! 한 반복: 제어 메시지 처리 → 캡처 → 분류 → 전이 추적 → 예약 → 발사 확인 → 대기.
//! 트래커, 보정기, 주기 추정기는 이 루프만 수정한다.
//!
//! 어떤 단계의 실패도 루프를 끝내지 않는다. 종료는 `Quit` 메시지, 또는 유한 소스가 소진되고
//! 대기 액션이 없을 때뿐이다.

use flicker_automation::scheduler::{ActionScheduler, PollOutcome};
use flicker_core::config::RunConfig;
use flicker_core::error::CoreError;
use flicker_core::models::classification::Classification;
use flicker_core::models::control::ControlMessage;
use flicker_core::models::symbol::ActionKind;
use flicker_core::models::transition::TransitionEvent;
use flicker_core::ports::action_sink::ActionSink;
use flicker_core::ports::classifier::SymbolClassifier;
use flicker_core::ports::frame_source::FrameSource;
use flicker_timing::action_map::ActionMap;
use flicker_timing::calibrator::DelayCalibrator;
use flicker_timing::periodicity::TickPeriodEstimator;
use flicker_timing::tracker::{TrackerOutcome, TransitionTracker};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::control::ControlChannel;
use crate::stats::SessionStats;

/// 프레임 예산 = 폴링 간격 × 이 값
const FRAME_BUDGET_FACTOR: u32 = 4;

/// 주기 경고에 필요한 최소 간격 샘플 수
const MIN_PERIOD_SAMPLES: usize = 3;

/// 한 반복의 결과
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// 종료 요청
    Quit,
    /// 일시정지 중 (캡처 안 함)
    Paused,
    /// 프레임 없음 (캡처 실패)
    Skipped,
    /// 정상 반복
    Ran {
        transition: Option<TransitionEvent>,
        fired: Vec<ActionKind>,
    },
}

enum FrameOutcome {
    /// 캡처 실패로 틱 건너뜀
    Skipped,
    Processed(Option<TransitionEvent>),
}

pub struct TickLoop {
    source: Box<dyn FrameSource>,
    classifier: Arc<dyn SymbolClassifier>,
    tracker: TransitionTracker,
    actions: ActionMap,
    calibrator: DelayCalibrator,
    scheduler: ActionScheduler,
    periodicity: TickPeriodEstimator,
    control: ControlChannel,
    stats: SessionStats,
    poll_interval: Duration,
    stats_interval: Duration,
    fire_unarmed: bool,
    paused: bool,
    capture_failing: bool,
    period_warned: HashSet<ActionKind>,
    last_stats_log: Instant,
}

impl TickLoop {
    /// 설정에서 트래커/액션 규칙/스케줄러를 만들어 루프 구성
    pub fn new(
        config: &RunConfig,
        source: Box<dyn FrameSource>,
        classifier: Arc<dyn SymbolClassifier>,
        calibrator: DelayCalibrator,
        sink: Arc<dyn ActionSink>,
        control: ControlChannel,
    ) -> Result<Self, CoreError> {
        let tracker = TransitionTracker::from_config(&config.tracker)?;
        Ok(Self {
            source,
            classifier,
            tracker,
            actions: ActionMap::new(config.transitions.clone()),
            calibrator,
            scheduler: ActionScheduler::new(sink, &config.scheduler),
            periodicity: TickPeriodEstimator::default(),
            control,
            stats: SessionStats::new(),
            poll_interval: config.poll_interval(),
            stats_interval: config.stats_interval(),
            fire_unarmed: config.scheduler.fire_unarmed,
            paused: false,
            capture_failing: false,
            period_warned: HashSet::new(),
            last_stats_log: Instant::now(),
        })
    }

    /// 루프 실행. 종료 시 보정 상태를 저장하고 최종 통계를 반환한다.
    pub async fn run(mut self) -> SessionStats {
        info!(
            source = self.source.name(),
            poll_ms = self.poll_interval.as_millis() as u64,
            cooldown_ms = self.scheduler.min_cooldown().as_millis() as u64,
            fire_unarmed = self.fire_unarmed,
            "폴링 루프 시작"
        );

        loop {
            if self.step_at(Instant::now()).await == StepOutcome::Quit {
                break;
            }
            let sleep = self.next_sleep(Instant::now());
            if !sleep.is_zero() {
                tokio::time::sleep(sleep).await;
            }
        }

        self.shutdown()
    }

    /// 한 반복 수행 (`now`는 제어/발사 판정 시각)
    pub async fn step_at(&mut self, now: Instant) -> StepOutcome {
        for message in self.control.drain() {
            if self.handle_control(message, now) {
                return StepOutcome::Quit;
            }
        }
        if self.paused {
            return StepOutcome::Paused;
        }

        let transition = match self.process_frame() {
            FrameOutcome::Processed(transition) => transition,
            FrameOutcome::Skipped => {
                self.fire_due(now).await;
                // 유한 소스가 끝나도 대기 액션은 발사/폐기될 때까지 기다린다
                if self.source.is_exhausted() && self.scheduler.pending_count() == 0 {
                    info!(source = self.source.name(), "프레임 소스 종료");
                    return StepOutcome::Quit;
                }
                return StepOutcome::Skipped;
            }
        };

        let fired = self.fire_due(now).await;
        self.maybe_log_stats(now);
        StepOutcome::Ran { transition, fired }
    }

    /// 캡처 → 분류 → 추적
    fn process_frame(&mut self) -> FrameOutcome {
        let started = Instant::now();
        let frame = match self.source.capture() {
            Ok(frame) if !frame.is_empty() => frame,
            Ok(_) => {
                self.note_capture_failure("빈 프레임");
                return FrameOutcome::Skipped;
            }
            Err(e) => {
                self.note_capture_failure(&e.to_string());
                return FrameOutcome::Skipped;
            }
        };
        if self.capture_failing {
            info!("캡처 복구");
            self.capture_failing = false;
        }
        self.stats.frames += 1;

        let result = self.classifier.classify(&frame);
        match &result.classification {
            Classification::Found { .. } => self.stats.found += 1,
            Classification::NotFound { .. } => self.stats.not_found += 1,
        }

        let elapsed = started.elapsed();
        let budget = self.poll_interval * FRAME_BUDGET_FACTOR;
        if elapsed > budget {
            self.stats.over_budget_ticks += 1;
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "프레임 처리 예산 초과"
            );
        }

        match self.tracker.observe(&result) {
            TrackerOutcome::Transition(event) => {
                self.on_transition(&event);
                FrameOutcome::Processed(Some(event))
            }
            TrackerOutcome::OutOfOrder { .. } => {
                self.stats.out_of_order += 1;
                FrameOutcome::Processed(None)
            }
            TrackerOutcome::NoSignal | TrackerOutcome::Repeat | TrackerOutcome::Seeded(_) => {
                FrameOutcome::Processed(None)
            }
        }
    }

    fn note_capture_failure(&mut self, reason: &str) {
        self.stats.capture_failures += 1;
        if self.capture_failing {
            debug!(reason, "캡처 실패, 틱 건너뜀");
        } else {
            warn!(source = self.source.name(), reason, "캡처 실패, 틱 건너뜀");
            self.capture_failing = true;
        }
    }

    fn on_transition(&mut self, event: &TransitionEvent) {
        self.stats.transitions += 1;
        self.periodicity.observe(event.timestamp);

        let Some(kind) = self.actions.resolve(event).cloned() else {
            self.stats.unmapped += 1;
            debug!(to = %event.new, "매핑 규칙 없는 전이");
            return;
        };
        self.calibrator.note_detection(&kind, event.timestamp);

        if !self.fire_unarmed && !self.calibrator.is_armed(&kind) {
            self.stats.observed_only += 1;
            debug!(kind = %kind, "보정 미무장: 관찰만");
            return;
        }

        self.scheduler.on_transition(event, &kind, &self.calibrator);
        self.check_period(&kind);
    }

    /// 보정 지연이 관측 틱 주기보다 길면 (종류별 한 번) 경고
    fn check_period(&mut self, kind: &ActionKind) {
        if self.periodicity.sample_len() < MIN_PERIOD_SAMPLES {
            return;
        }
        let Some(period) = self.periodicity.period() else {
            return;
        };
        let delay = self.calibrator.estimate(kind);
        if delay > period && self.period_warned.insert(kind.clone()) {
            warn!(
                kind = %kind,
                delay_ms = delay.as_millis() as u64,
                period_ms = period.as_millis() as u64,
                "보정 지연이 틱 주기보다 김: 다음 전이가 먼저 올 수 있음"
            );
        }
    }

    /// 발사 가능한 액션 모두 처리
    async fn fire_due(&mut self, now: Instant) -> Vec<ActionKind> {
        let mut fired = Vec::new();
        loop {
            match self.scheduler.poll(now).await {
                PollOutcome::Fired(kind) => fired.push(kind),
                PollOutcome::Failed(_) => {}
                PollOutcome::Idle | PollOutcome::Waiting | PollOutcome::Deferred { .. } => break,
            }
        }
        self.stats.scheduler = self.scheduler.stats();
        fired
    }

    /// 제어 메시지 처리. 종료 요청이면 true.
    fn handle_control(&mut self, message: ControlMessage, now: Instant) -> bool {
        match message {
            ControlMessage::Pause => {
                if !self.paused {
                    self.paused = true;
                    let dropped = self.scheduler.clear_pending();
                    self.periodicity.break_chain();
                    info!(dropped, "일시정지");
                }
            }
            ControlMessage::Resume => {
                if self.paused {
                    self.paused = false;
                    info!(
                        last = self.tracker.last_accepted().map(|s| s.as_str()).unwrap_or("∅"),
                        "재개"
                    );
                }
            }
            ControlMessage::MarkIdeal(kind) => {
                match self.calibrator.mark_ideal(kind.as_ref(), now) {
                    Ok(sample) => {
                        self.stats.marks += 1;
                        info!(
                            kind = %sample.action_kind,
                            delay_ms = sample.delay_ms,
                            estimate_ms = sample.estimate_ms,
                            armed = self.calibrator.is_armed(&sample.action_kind),
                            "이상 시점 표시"
                        );
                    }
                    Err(e) => {
                        self.stats.rejected_marks += 1;
                        warn!("이상 시점 표시 거부: {e}");
                    }
                }
            }
            ControlMessage::Reset(kind) => {
                self.calibrator.reset(kind.as_ref());
                self.period_warned.clear();
            }
            ControlMessage::AdjustCooldown(delta) => {
                self.scheduler.adjust_cooldown(delta);
            }
            ControlMessage::Quit => {
                info!("종료 요청");
                return true;
            }
        }
        false
    }

    /// 다음 반복까지 대기 시간: 폴링 간격과 가장 이른 예약 시각 중 빠른 쪽
    pub fn next_sleep(&self, now: Instant) -> Duration {
        if self.paused {
            return self.poll_interval;
        }
        match self.scheduler.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(self.poll_interval),
            None => self.poll_interval,
        }
    }

    fn maybe_log_stats(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_stats_log) >= self.stats_interval {
            self.last_stats_log = now;
            self.stats.log_summary("periodic", self.periodicity.period());
        }
    }

    /// 보정 저장 + 최종 통계
    fn shutdown(mut self) -> SessionStats {
        if let Err(e) = self.calibrator.persist() {
            warn!("종료 시 보정 저장 실패: {e}");
        }
        self.stats.scheduler = self.scheduler.stats();
        self.stats.log_summary("final", self.periodicity.period());
        info!("폴링 루프 종료");
        self.stats
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn calibrator(&self) -> &DelayCalibrator {
        &self.calibrator
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    pub fn tracker(&self) -> &TransitionTracker {
        &self.tracker
    }

    pub fn tick_period(&self) -> Option<Duration> {
        self.periodicity.period()
    }
}
