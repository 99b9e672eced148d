//! 지연 보정기.
//!
//! 액션 종류별 "검출 → 이상적인 발사 시점" 지연 샘플을 모으고 중앙값을 추정치로 쓴다.
//! 샘플은 운영자의 "지금" 표시로 들어오며, 새 샘플마다 저장소에 즉시 기록한다.
//!
//! 저장소 장애는 절대 루프를 멈추지 않는다. 로드 실패는 기본값, 저장 실패는 경고로 끝나고
//! 다음 성공한 기록이 파일을 다시 쓴다.

use flicker_core::config::CalibrationConfig;
use flicker_core::error::CoreError;
use flicker_core::models::calibration::{is_valid_sample, CalibrationSnapshot, DelayEstimate};
use flicker_core::models::symbol::ActionKind;
use flicker_core::ports::calibration_store::CalibrationStore;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 표시 하나로 기록된 샘플
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedSample {
    pub action_kind: ActionKind,
    pub delay_ms: f64,
    /// 기록 후 추정치
    pub estimate_ms: f64,
}

pub struct DelayCalibrator {
    default_delay_ms: f64,
    capacity: usize,
    arm_after: usize,
    max_sample_ms: f64,
    estimates: BTreeMap<ActionKind, DelayEstimate>,
    last_detection: HashMap<ActionKind, Instant>,
    latest_detection: Option<(ActionKind, Instant)>,
    armed: HashSet<ActionKind>,
    store: Option<Box<dyn CalibrationStore>>,
}

impl DelayCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            default_delay_ms: config.default_delay_ms.max(0.0),
            capacity: config.capacity.max(1),
            arm_after: config.arm_after,
            max_sample_ms: config.max_sample_ms,
            estimates: BTreeMap::new(),
            last_detection: HashMap::new(),
            latest_detection: None,
            armed: HashSet::new(),
            store: None,
        }
    }

    /// write-through 저장소 연결
    pub fn with_store(mut self, store: Box<dyn CalibrationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 저장소 상태를 메모리에 병합. 저장된 종류는 저장 샘플로 교체된다.
    ///
    /// 읽기 실패나 손상은 경고 후 기본값 유지. 복원된 종류 수를 반환한다.
    pub fn load(&mut self) -> usize {
        let Some((loaded, describe)) = self.store.as_ref().map(|s| (s.load(), s.describe())) else {
            return 0;
        };
        let snapshot = match loaded {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(store = %describe, "보정 데이터 로드 실패, 기본값 사용: {e}");
                return 0;
            }
        };

        let restored = snapshot.len();
        for (kind, stored) in snapshot {
            let estimate = DelayEstimate::restore(
                kind.clone(),
                self.default_delay_ms,
                &stored,
                self.capacity,
                self.max_sample_ms,
            );
            let dropped = stored
                .samples
                .iter()
                .filter(|s| !is_valid_sample(**s, self.max_sample_ms))
                .count();
            if dropped > 0 {
                warn!(kind = %kind, dropped, "범위 밖 저장 샘플 무시");
            }
            debug!(
                kind = %kind,
                delay_ms = estimate.delay_ms(),
                samples = estimate.window_len(),
                "보정 추정치 복원"
            );
            self.estimates.insert(kind.clone(), estimate);
            self.update_armed(&kind);
        }
        info!(kinds = restored, store = %describe, "보정 데이터 로드");
        restored
    }

    /// 현재 상태 전체를 저장소에 기록
    pub fn persist(&self) -> Result<(), CoreError> {
        match &self.store {
            Some(store) => store.save(&self.snapshot()),
            None => Ok(()),
        }
    }

    /// 샘플 추가 + 중앙값 즉시 재계산 + write-through.
    ///
    /// 유한하지 않거나 `[0, max_sample_ms]` 밖의 샘플은 거부한다. 반환값은 새 추정치(ms).
    pub fn record_sample(&mut self, kind: &ActionKind, delay_ms: f64) -> Result<f64, CoreError> {
        if !is_valid_sample(delay_ms, self.max_sample_ms) {
            return Err(CoreError::validation(
                "calibration.sample",
                format!("잘못된 지연 샘플: {delay_ms}"),
            ));
        }

        let default_delay_ms = self.default_delay_ms;
        let estimate = self
            .estimates
            .entry(kind.clone())
            .or_insert_with(|| DelayEstimate::new(kind.clone(), default_delay_ms));
        estimate.push(delay_ms, self.capacity);
        let estimate_ms = estimate.delay_ms();
        info!(
            kind = %kind,
            sample_ms = delay_ms,
            estimate_ms,
            window = estimate.window_len(),
            "보정 샘플 기록"
        );

        self.update_armed(kind);
        self.write_through();
        Ok(estimate_ms)
    }

    /// 액션 종류의 검출 시각 기록 (표시 시 기준점)
    pub fn note_detection(&mut self, kind: &ActionKind, at: Instant) {
        self.last_detection.insert(kind.clone(), at);
        self.latest_detection = Some((kind.clone(), at));
    }

    /// "지금이 이상적인 순간" 표시.
    ///
    /// `kind`가 None이면 가장 최근 검출된 종류로 귀속한다.
    /// 검출 기록이 없거나, 검출보다 이르거나, `max_sample_ms`보다 오래된 표시는 거부한다.
    pub fn mark_ideal(
        &mut self,
        kind: Option<&ActionKind>,
        now: Instant,
    ) -> Result<MarkedSample, CoreError> {
        let (kind, detected_at) = match kind {
            Some(kind) => {
                let at = self.last_detection.get(kind).copied().ok_or_else(|| {
                    CoreError::NotFound {
                        resource_type: "Detection".to_string(),
                        id: kind.to_string(),
                    }
                })?;
                (kind.clone(), at)
            }
            None => self.latest_detection.clone().ok_or_else(|| CoreError::NotFound {
                resource_type: "Detection".to_string(),
                id: "latest".to_string(),
            })?,
        };

        let Some(elapsed) = now.checked_duration_since(detected_at) else {
            return Err(CoreError::validation(
                "calibration.mark",
                "표시 시각이 검출 시각보다 이름",
            ));
        };
        let delay_ms = elapsed.as_secs_f64() * 1000.0;
        if delay_ms > self.max_sample_ms {
            return Err(CoreError::validation(
                "calibration.mark",
                format!(
                    "오래된 검출에 대한 표시: {delay_ms:.0}ms > {:.0}ms",
                    self.max_sample_ms
                ),
            ));
        }

        let estimate_ms = self.record_sample(&kind, delay_ms)?;
        Ok(MarkedSample {
            action_kind: kind,
            delay_ms,
            estimate_ms,
        })
    }

    /// 현재 추정 지연. 샘플이 없으면 기본값 (콜드 스타트에서도 실패하지 않음).
    pub fn estimate(&self, kind: &ActionKind) -> Duration {
        Duration::from_micros((self.estimate_ms(kind) * 1000.0).round() as u64)
    }

    pub fn estimate_ms(&self, kind: &ActionKind) -> f64 {
        self.estimates
            .get(kind)
            .map(DelayEstimate::delay_ms)
            .unwrap_or(self.default_delay_ms)
    }

    /// 창에 `arm_after`개 이상 샘플이 있으면 무장 상태
    pub fn is_armed(&self, kind: &ActionKind) -> bool {
        self.arm_after == 0
            || self
                .estimates
                .get(kind)
                .map_or(false, |e| e.window_len() >= self.arm_after)
    }

    /// 샘플 초기화 (None이면 전체). 무장 해제 후 저장소에 기록한다.
    pub fn reset(&mut self, kind: Option<&ActionKind>) {
        match kind {
            Some(kind) => {
                if let Some(estimate) = self.estimates.get_mut(kind) {
                    estimate.clear();
                }
                self.armed.remove(kind);
                info!(kind = %kind, "보정 샘플 초기화");
            }
            None => {
                for estimate in self.estimates.values_mut() {
                    estimate.clear();
                }
                self.armed.clear();
                info!("전체 보정 샘플 초기화");
            }
        }
        self.write_through();
    }

    pub fn get(&self, kind: &ActionKind) -> Option<&DelayEstimate> {
        self.estimates.get(kind)
    }

    pub fn estimates(&self) -> impl Iterator<Item = &DelayEstimate> {
        self.estimates.values()
    }

    pub fn last_detection(&self, kind: &ActionKind) -> Option<Instant> {
        self.last_detection.get(kind).copied()
    }

    /// 영속화 스냅샷
    pub fn snapshot(&self) -> CalibrationSnapshot {
        self.estimates
            .iter()
            .map(|(kind, estimate)| (kind.clone(), estimate.to_stored()))
            .collect()
    }

    fn update_armed(&mut self, kind: &ActionKind) {
        if self.is_armed(kind) && self.armed.insert(kind.clone()) {
            info!(
                kind = %kind,
                delay_ms = self.estimate_ms(kind),
                "보정 무장 완료"
            );
        }
    }

    fn write_through(&self) {
        if let Err(e) = self.persist() {
            warn!("보정 데이터 저장 실패 (다음 샘플에서 재시도): {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicker_core::models::calibration::StoredEstimate;
    use flicker_storage::json_store::JsonCalibrationStore;
    use flicker_storage::memory::InMemoryCalibrationStore;
    use tempfile::TempDir;

    fn config() -> CalibrationConfig {
        CalibrationConfig {
            default_delay_ms: 40.0,
            capacity: 5,
            arm_after: 5,
            max_sample_ms: 2_000.0,
            store_path: None,
        }
    }

    fn engage() -> ActionKind {
        ActionKind::new("engage")
    }

    /// 항상 실패하는 저장소
    struct BrokenStore;

    impl CalibrationStore for BrokenStore {
        fn load(&self) -> Result<CalibrationSnapshot, CoreError> {
            Err(CoreError::Storage("corrupt".to_string()))
        }

        fn save(&self, _snapshot: &CalibrationSnapshot) -> Result<(), CoreError> {
            Err(CoreError::Storage("read-only".to_string()))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[test]
    fn cold_start_returns_default() {
        let calibrator = DelayCalibrator::new(&config());
        assert_eq!(calibrator.estimate_ms(&engage()), 40.0);
        assert_eq!(calibrator.estimate(&engage()), Duration::from_millis(40));
        assert!(!calibrator.is_armed(&engage()));
    }

    #[test]
    fn median_and_fifo_eviction() {
        let mut calibrator = DelayCalibrator::new(&config());
        for s in [100.0, 120.0, 90.0, 110.0, 130.0] {
            calibrator.record_sample(&engage(), s).unwrap();
        }
        assert_eq!(calibrator.estimate_ms(&engage()), 110.0);
        assert!(calibrator.is_armed(&engage()));

        // 100이 밀려남 → [120, 90, 110, 130, 200] → 120
        let estimate = calibrator.record_sample(&engage(), 200.0).unwrap();
        assert_eq!(estimate, 120.0);
        let window: Vec<f64> = calibrator.get(&engage()).unwrap().samples().collect();
        assert_eq!(window, vec![120.0, 90.0, 110.0, 130.0, 200.0]);
    }

    #[test]
    fn invalid_sample_rejected() {
        let mut calibrator = DelayCalibrator::new(&config());
        assert!(calibrator.record_sample(&engage(), -1.0).is_err());
        assert!(calibrator.record_sample(&engage(), f64::NAN).is_err());
        assert!(calibrator.record_sample(&engage(), 2_000.5).is_err());
        assert!(calibrator.get(&engage()).is_none());
    }

    #[test]
    fn mark_uses_latest_detection() {
        let mut calibrator = DelayCalibrator::new(&config());
        let t0 = Instant::now();
        calibrator.note_detection(&ActionKind::new("disengage"), t0);
        calibrator.note_detection(&engage(), t0 + Duration::from_millis(100));

        let marked = calibrator
            .mark_ideal(None, t0 + Duration::from_millis(250))
            .unwrap();
        assert_eq!(marked.action_kind, engage());
        assert!((marked.delay_ms - 150.0).abs() < 1e-6);
        assert!((calibrator.estimate_ms(&engage()) - 150.0).abs() < 1e-6);

        let explicit = calibrator
            .mark_ideal(Some(&ActionKind::new("disengage")), t0 + Duration::from_millis(300))
            .unwrap();
        assert!((explicit.delay_ms - 300.0).abs() < 1e-6);
    }

    #[test]
    fn mark_rejects_missing_stale_and_early() {
        let mut calibrator = DelayCalibrator::new(&config());
        let t0 = Instant::now();
        assert!(matches!(
            calibrator.mark_ideal(None, t0),
            Err(CoreError::NotFound { .. })
        ));

        calibrator.note_detection(&engage(), t0 + Duration::from_millis(500));
        assert!(calibrator.mark_ideal(Some(&engage()), t0).is_err());
        assert!(calibrator
            .mark_ideal(Some(&engage()), t0 + Duration::from_secs(10))
            .is_err());
        assert!(calibrator.get(&engage()).is_none());
    }

    #[test]
    fn reset_clears_and_disarms() {
        let mut calibrator = DelayCalibrator::new(&config());
        for s in [10.0, 20.0, 30.0, 40.0, 50.0] {
            calibrator.record_sample(&engage(), s).unwrap();
            calibrator.record_sample(&ActionKind::new("other"), s).unwrap();
        }
        calibrator.reset(Some(&engage()));
        assert!(!calibrator.is_armed(&engage()));
        assert_eq!(calibrator.estimate_ms(&engage()), 40.0);
        assert!(calibrator.is_armed(&ActionKind::new("other")));

        calibrator.reset(None);
        assert!(!calibrator.is_armed(&ActionKind::new("other")));
    }

    #[test]
    fn write_through_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.json");

        let mut calibrator =
            DelayCalibrator::new(&config()).with_store(Box::new(JsonCalibrationStore::new(&path)));
        calibrator.record_sample(&engage(), 80.0).unwrap();
        calibrator.record_sample(&engage(), 100.0).unwrap();
        assert!(path.exists());

        let mut reloaded =
            DelayCalibrator::new(&config()).with_store(Box::new(JsonCalibrationStore::new(&path)));
        assert_eq!(reloaded.load(), 1);
        assert_eq!(reloaded.estimate_ms(&engage()), 90.0);
        assert_eq!(reloaded.get(&engage()).unwrap().sample_count(), 2);
    }

    #[test]
    fn load_prefers_stored_samples() {
        let store = InMemoryCalibrationStore::default();
        let mut snapshot = CalibrationSnapshot::new();
        snapshot.insert(
            engage(),
            StoredEstimate {
                delay_ms: 0.0,
                samples: vec![60.0, 70.0, 80.0, 90.0, 100.0],
                sample_count: 5,
            },
        );
        store.save(&snapshot).unwrap();

        let mut calibrator = DelayCalibrator::new(&config()).with_store(Box::new(store));
        calibrator.load();
        assert_eq!(calibrator.estimate_ms(&engage()), 80.0);
        assert!(calibrator.is_armed(&engage()));
    }

    #[test]
    fn load_ignores_out_of_range_samples() {
        let store = InMemoryCalibrationStore::default();
        let mut snapshot = CalibrationSnapshot::new();
        snapshot.insert(
            engage(),
            StoredEstimate {
                delay_ms: 1e300,
                samples: vec![1e300],
                sample_count: 1,
            },
        );
        store.save(&snapshot).unwrap();

        let mut calibrator = DelayCalibrator::new(&config()).with_store(Box::new(store));
        calibrator.load();
        assert_eq!(calibrator.estimate_ms(&engage()), 40.0);
        assert_eq!(calibrator.estimate(&engage()), Duration::from_millis(40));
        assert!(!calibrator.is_armed(&engage()));
    }

    #[test]
    fn broken_store_never_fails_calibration() {
        let mut calibrator = DelayCalibrator::new(&config()).with_store(Box::new(BrokenStore));
        assert_eq!(calibrator.load(), 0);
        assert_eq!(calibrator.estimate_ms(&engage()), 40.0);

        let estimate = calibrator.record_sample(&engage(), 75.0).unwrap();
        assert_eq!(estimate, 75.0);
        assert!(calibrator.persist().is_err());
    }
}
