//! 캡처 프레임 모델.

use image::RgbaImage;
use std::time::Instant;

/// 프레임 소스가 반환하는 캡처 이미지 (뷰포트 영역)
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGBA 픽셀
    pub image: RgbaImage,
    /// 캡처 시각 (단조 시계)
    pub captured_at: Instant,
}

impl Frame {
    /// 현재 시각으로 프레임 생성
    pub fn new(image: RgbaImage) -> Self {
        Self::captured_at(image, Instant::now())
    }

    pub fn captured_at(image: RgbaImage, captured_at: Instant) -> Self {
        Self { image, captured_at }
    }

    /// 너비나 높이가 0인 프레임 (캡처 실패와 동일하게 취급)
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}
