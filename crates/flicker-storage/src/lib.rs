//! # flicker-storage
//!
//! `CalibrationStore` 포트 구현.
//!
//! - [`json_store`]: `{ action_kind: { delay_ms, samples } }` JSON 파일 (임시 파일 → rename)
//! - [`memory`]: 테스트/드라이런용 인메모리 저장소

pub mod json_store;
pub mod memory;
