//! # flicker-app
//!
//! 폴링 루프와 제어 표면. 바이너리(`flicker`)는 여기 구성요소를 와이어링만 한다.
//!
//! - [`tick_loop`]: 캡처 → 분류 → 전이 → 예약 → 발사 폴링 루프
//! - [`control`]: lock-free 제어 메시지 큐
//! - [`console`]: 표준 입력 명령 해석
//! - [`lifecycle`]: OS 시그널 → 종료 요청
//! - [`stats`]: 세션 통계

pub mod console;
pub mod control;
pub mod lifecycle;
pub mod stats;
pub mod tick_loop;
