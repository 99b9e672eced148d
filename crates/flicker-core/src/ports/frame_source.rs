//! 프레임 소스 포트.
//!
//! 구현: `flicker-vision` crate (`ScreenCapture`, `ReplayFrameSource`)

use crate::error::CoreError;
use crate::models::frame::Frame;

/// 화면/뷰포트 캡처: "지금 캡처" 동기 호출
///
/// `Err`는 일시적 실패로 취급되어 해당 틱만 건너뛴다.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame, CoreError>;

    /// 소스 이름 (로그용, 예: "xcap", "replay")
    fn name(&self) -> &str;

    /// 더 이상 프레임이 없는 유한 소스인지 (라이브 캡처는 항상 false)
    fn is_exhausted(&self) -> bool {
        false
    }
}
