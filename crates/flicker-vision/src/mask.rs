//! 전경 색상 마스크.
//!
//! "이 픽셀이 전경인가" 판정은 게임 에셋마다 다르므로 교체 가능한 술어로 둔다.
//! 설정의 `MaskSpec`에서 HSV/RGB/밝기 범위 구현을 만들 수 있고,
//! 클로저도 그대로 `ForegroundMask`로 쓸 수 있다.

use flicker_core::config::MaskSpec;
use image::{GrayImage, Luma, RgbaImage};

/// 이진 마스크 전경 값
pub const FOREGROUND: u8 = 255;

/// 픽셀 전경 판정 술어
pub trait ForegroundMask: Send + Sync {
    fn is_foreground(&self, rgb: [u8; 3]) -> bool;
}

impl<F> ForegroundMask for F
where
    F: Fn([u8; 3]) -> bool + Send + Sync,
{
    fn is_foreground(&self, rgb: [u8; 3]) -> bool {
        self(rgb)
    }
}

/// HSV 범위 마스크 (hue: 도, sat/val: 0-1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvRange {
    pub hue_min: f32,
    pub hue_max: f32,
    pub sat_min: f32,
    pub sat_max: f32,
    pub val_min: f32,
    pub val_max: f32,
}

impl ForegroundMask for HsvRange {
    fn is_foreground(&self, rgb: [u8; 3]) -> bool {
        let (h, s, v) = rgb_to_hsv(rgb);
        let hue_ok = if self.hue_min <= self.hue_max {
            h >= self.hue_min && h <= self.hue_max
        } else {
            // 0도를 감싸는 범위 (예: 빨강 350..10)
            h >= self.hue_min || h <= self.hue_max
        };
        hue_ok && s >= self.sat_min && s <= self.sat_max && v >= self.val_min && v <= self.val_max
    }
}

/// RGB 채널별 범위 마스크
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl ForegroundMask for RgbRange {
    fn is_foreground(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|i| rgb[i] >= self.min[i] && rgb[i] <= self.max[i])
    }
}

/// 밝기 범위 마스크
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumaRange {
    pub min: u8,
    pub max: u8,
}

impl ForegroundMask for LumaRange {
    fn is_foreground(&self, rgb: [u8; 3]) -> bool {
        let l = luma(rgb);
        l >= self.min && l <= self.max
    }
}

/// 설정 명세 → 마스크 구현
pub fn mask_from_spec(spec: &MaskSpec) -> Box<dyn ForegroundMask> {
    match *spec {
        MaskSpec::Hsv {
            hue_min,
            hue_max,
            sat_min,
            sat_max,
            val_min,
            val_max,
        } => Box::new(HsvRange {
            hue_min,
            hue_max,
            sat_min,
            sat_max,
            val_min,
            val_max,
        }),
        MaskSpec::Rgb { min, max } => Box::new(RgbRange { min, max }),
        MaskSpec::Luma { min, max } => Box::new(LumaRange { min, max }),
    }
}

/// 프레임에 마스크 적용 → 이진 마스크 (전경 255 / 배경 0)
pub fn apply_mask(image: &RgbaImage, mask: &dyn ForegroundMask) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, _] = pixel.0;
        if mask.is_foreground([r, g, b]) {
            out.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    out
}

/// 전경 픽셀 존재 여부
pub fn has_foreground(mask: &GrayImage) -> bool {
    mask.as_raw().iter().any(|&v| v == FOREGROUND)
}

/// ITU-R BT.601 밝기
pub fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb;
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

/// RGB → HSV (h: 0..360, s/v: 0..1)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let sat = if max == 0.0 { 0.0 } else { delta / max };
    (hue, sat, max)
}
