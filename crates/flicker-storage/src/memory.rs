//! 인메모리 보정 저장소.

use flicker_core::error::CoreError;
use flicker_core::models::calibration::CalibrationSnapshot;
use flicker_core::ports::calibration_store::CalibrationStore;
use parking_lot::Mutex;
use std::sync::Arc;

/// 프로세스 메모리에만 보관하는 저장소. 복제본끼리 같은 스냅샷을 공유한다.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalibrationStore {
    snapshot: Arc<Mutex<CalibrationSnapshot>>,
}

impl InMemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 저장된 스냅샷 복제본
    pub fn current(&self) -> CalibrationSnapshot {
        self.snapshot.lock().clone()
    }
}

impl CalibrationStore for InMemoryCalibrationStore {
    fn load(&self) -> Result<CalibrationSnapshot, CoreError> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &CalibrationSnapshot) -> Result<(), CoreError> {
        *self.snapshot.lock() = snapshot.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicker_core::models::calibration::StoredEstimate;
    use flicker_core::models::symbol::ActionKind;

    #[test]
    fn clones_share_state() {
        let store = InMemoryCalibrationStore::new();
        let handle = store.clone();
        assert!(store.load().unwrap().is_empty());

        let mut snapshot = CalibrationSnapshot::new();
        snapshot.insert(
            ActionKind::new("engage"),
            StoredEstimate {
                delay_ms: 55.0,
                samples: vec![55.0],
                sample_count: 1,
            },
        );
        store.save(&snapshot).unwrap();
        assert_eq!(handle.current(), snapshot);
    }
}
