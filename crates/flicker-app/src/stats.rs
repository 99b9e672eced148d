//! 세션 통계.
//!
//! 폴링 루프 카운터. 주기적으로, 그리고 종료 시 한 번 요약 로그로 남긴다.

use chrono::{DateTime, Utc};
use flicker_automation::scheduler::SchedulerStats;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub frames: u64,
    pub capture_failures: u64,
    pub found: u64,
    pub not_found: u64,
    pub transitions: u64,
    pub out_of_order: u64,
    /// 매핑 규칙이 없는 전이
    pub unmapped: u64,
    /// 보정 미무장으로 관찰만 한 전이
    pub observed_only: u64,
    pub marks: u64,
    pub rejected_marks: u64,
    pub over_budget_ticks: u64,
    pub scheduler: SchedulerStats,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            frames: 0,
            capture_failures: 0,
            found: 0,
            not_found: 0,
            transitions: 0,
            out_of_order: 0,
            unmapped: 0,
            observed_only: 0,
            marks: 0,
            rejected_marks: 0,
            over_budget_ticks: 0,
            scheduler: SchedulerStats::default(),
        }
    }

    /// 검출률 (분류된 프레임 중 Found 비율)
    pub fn hit_rate(&self) -> f64 {
        let classified = self.found + self.not_found;
        if classified == 0 {
            return 0.0;
        }
        self.found as f64 / classified as f64
    }

    /// 요약 로그
    pub fn log_summary(&self, label: &str, tick_period: Option<Duration>) {
        let uptime_secs = (Utc::now() - self.started_at).num_seconds();
        let s = &self.scheduler;
        info!(
            label,
            uptime_secs,
            frames = self.frames,
            capture_failures = self.capture_failures,
            found = self.found,
            not_found = self.not_found,
            hit_rate = %format!("{:.1}%", self.hit_rate() * 100.0),
            transitions = self.transitions,
            out_of_order = self.out_of_order,
            unmapped = self.unmapped,
            observed_only = self.observed_only,
            marks = self.marks,
            rejected_marks = self.rejected_marks,
            over_budget_ticks = self.over_budget_ticks,
            scheduled = s.scheduled,
            superseded = s.superseded,
            fired = s.fired,
            fire_failures = s.fire_failures,
            deferred_by_cooldown = s.deferred_by_cooldown,
            tick_period_ms = tick_period.map(|p| p.as_millis() as u64),
            "세션 통계"
        );
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_empty() {
        let mut stats = SessionStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.found = 3;
        stats.not_found = 1;
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
