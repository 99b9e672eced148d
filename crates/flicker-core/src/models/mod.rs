//! Flicker 도메인 모델.
//!
//! 프레임 → 분류 → 전이 → 예약 → 발사 파이프라인에서 흐르는 데이터 구조체를 정의한다.

pub mod calibration;
pub mod classification;
pub mod control;
pub mod frame;
pub mod symbol;
pub mod transition;
