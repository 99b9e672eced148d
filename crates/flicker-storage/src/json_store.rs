//! JSON 파일 보정 저장소.
//!
//! 파일 형식: `{ "<action_kind>": { "delay_ms": f64, "samples": [f64...], "sample_count": u64 } }`.
//! 저장은 같은 디렉토리의 임시 파일에 쓴 뒤 rename 하여 중간 상태 파일이 남지 않게 한다.

use flicker_core::error::CoreError;
use flicker_core::models::calibration::CalibrationSnapshot;
use flicker_core::ports::calibration_store::CalibrationStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 임시 파일 확장자
const TEMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct JsonCalibrationStore {
    path: PathBuf,
}

impl JsonCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension(TEMP_SUFFIX)
    }
}

impl CalibrationStore for JsonCalibrationStore {
    fn load(&self) -> Result<CalibrationSnapshot, CoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "보정 파일 없음: 빈 스냅샷");
            return Ok(CalibrationSnapshot::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CoreError::Storage(format!("보정 파일 읽기 실패: {}: {e}", self.path.display()))
        })?;
        if content.trim().is_empty() {
            return Ok(CalibrationSnapshot::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            CoreError::Storage(format!("보정 파일 파싱 실패: {}: {e}", self.path.display()))
        })
    }

    fn save(&self, snapshot: &CalibrationSnapshot) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Storage(format!(
                        "보정 디렉토리 생성 실패: {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, content).map_err(|e| {
            CoreError::Storage(format!("보정 임시 파일 쓰기 실패: {}: {e}", temp.display()))
        })?;
        fs::rename(&temp, &self.path).map_err(|e| {
            CoreError::Storage(format!("보정 파일 교체 실패: {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), kinds = snapshot.len(), "보정 파일 저장");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicker_core::models::calibration::StoredEstimate;
    use flicker_core::models::symbol::ActionKind;
    use tempfile::TempDir;

    fn snapshot() -> CalibrationSnapshot {
        let mut snapshot = CalibrationSnapshot::new();
        snapshot.insert(
            ActionKind::new("engage"),
            StoredEstimate {
                delay_ms: 110.0,
                samples: vec![100.0, 110.0, 120.0],
                sample_count: 7,
            },
        );
        snapshot
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonCalibrationStore::new(dir.path().join("calibration.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("calibration.json");
        let store = JsonCalibrationStore::new(&path);

        store.save(&snapshot()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(store.load().unwrap(), snapshot());
    }

    #[test]
    fn file_layout_is_keyed_by_action_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.json");
        JsonCalibrationStore::new(&path).save(&snapshot()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["engage"]["delay_ms"], 110.0);
        assert_eq!(raw["engage"]["samples"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn hand_written_file_without_optional_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.json");
        fs::write(&path, r#"{ "engage": { "delay_ms": 90.0 } }"#).unwrap();

        let loaded = JsonCalibrationStore::new(&path).load().unwrap();
        let engage = &loaded[&ActionKind::new("engage")];
        assert_eq!(engage.delay_ms, 90.0);
        assert!(engage.samples.is_empty());
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.json");
        fs::write(&path, "{ broken").unwrap();

        let err = JsonCalibrationStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }
}
