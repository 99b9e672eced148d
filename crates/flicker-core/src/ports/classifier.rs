//! 심볼 분류기 포트.
//!
//! 구현: `flicker-vision::classifier::DigitClassifier`

use crate::models::classification::ClassificationResult;
use crate::models::frame::Frame;

/// 프레임 하나에서 단일 심볼(또는 없음)을 판정
///
/// 같은 입력에 대해 항상 같은 결과를 반환해야 한다 (숨은 난수 없음).
pub trait SymbolClassifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> ClassificationResult;
}
