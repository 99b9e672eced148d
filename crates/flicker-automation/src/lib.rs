//! # flicker-automation
//!
//! 전이에 대한 외부 액션 발사.
//! 액션 종류 → 키/클릭 바인딩 매핑, 플랫폼 입력 드라이버,
//! 최신 전이 우선 + 전역 쿨다운 스케줄러를 담당한다.

pub mod action_sink;
pub mod input_driver;
pub mod scheduler;
