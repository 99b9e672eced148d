//! 보정 저장소 포트.
//!
//! 구현: `flicker-storage` crate (`JsonCalibrationStore`, `InMemoryCalibrationStore`)

use crate::error::CoreError;
use crate::models::calibration::CalibrationSnapshot;

/// 액션 종류별 지연 추정치의 영속 저장소
pub trait CalibrationStore: Send {
    /// 저장된 스냅샷 로드. 저장소가 아직 없으면 빈 스냅샷을 반환한다.
    fn load(&self) -> Result<CalibrationSnapshot, CoreError>;

    /// 스냅샷 전체를 기록 (write-through)
    fn save(&self, snapshot: &CalibrationSnapshot) -> Result<(), CoreError>;

    /// 저장소 위치 설명 (로그용)
    fn describe(&self) -> String;
}
