//! 틱 주기 추정.
//!
//! 수용된 전이 사이 간격의 중앙값. 내부 페이싱 진단용이며 명시적 보정을 대신하지 않는다.

use flicker_core::models::calibration::median;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 간격 창 크기
pub const DEFAULT_WINDOW: usize = 16;

#[derive(Debug, Clone)]
pub struct TickPeriodEstimator {
    last: Option<Instant>,
    intervals: VecDeque<f64>,
    window: usize,
}

impl TickPeriodEstimator {
    pub fn new(window: usize) -> Self {
        Self {
            last: None,
            intervals: VecDeque::with_capacity(window.max(1)),
            window: window.max(1),
        }
    }

    /// 전이 시각 기록. 시간이 거꾸로 가는 관찰은 기준점만 갱신한다.
    pub fn observe(&mut self, at: Instant) {
        if let Some(last) = self.last {
            if at > last {
                let micros = at.duration_since(last).as_micros() as f64;
                self.intervals.push_back(micros / 1000.0);
                while self.intervals.len() > self.window {
                    self.intervals.pop_front();
                }
            }
        }
        self.last = Some(at);
    }

    /// 추정 주기 (간격이 하나도 없으면 None)
    pub fn period(&self) -> Option<Duration> {
        let values: Vec<f64> = self.intervals.iter().copied().collect();
        median(&values).map(|ms| Duration::from_micros((ms * 1000.0).round() as u64))
    }

    pub fn sample_len(&self) -> usize {
        self.intervals.len()
    }

    /// 기준점만 해제 (일시정지 후 재개 시 정지 구간이 간격으로 잡히지 않도록)
    pub fn break_chain(&mut self) {
        self.last = None;
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.intervals.clear();
    }
}

impl Default for TickPeriodEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
