//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 각 어댑터 crate가 이 trait들을 구현하며, `flicker-app`에서 와이어링한다.
//!
//! 프레임 캡처와 분류는 폴링 루프 안에서 동기 호출되고,
//! 액션 발사/입력 전송만 `async_trait`을 사용한다.

pub mod action_sink;
pub mod calibration_store;
pub mod classifier;
pub mod frame_source;
pub mod input_driver;
