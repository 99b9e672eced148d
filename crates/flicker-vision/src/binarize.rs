//! Otsu 이진화 + 글리프 정규화.
//!
//! 템플릿과 후보 패치가 같은 표현(전경 255 / 배경 0, 전경 바운딩 박스로 타이트 크롭 후
//! 배경 테두리 1픽셀)이 되도록 맞춘다. 상관 비교는 이 정규화 이후에만 의미가 있다.
//! 테두리가 있어야 속이 꽉 찬 글리프(세로 막대 "1" 등)도 분산이 0이 되지 않는다.

use image::{GrayImage, Luma, RgbaImage};

use crate::mask::{luma, ForegroundMask, FOREGROUND};
use crate::regions::Region;

/// Otsu 임계값.
///
/// 클래스 간 분산을 최대화하는 `t`를 반환한다 (`v > t`가 전경).
/// 분할이 불가능한 경우(단일 밝기, 빈 이미지) 255를 반환해 전부 배경이 되게 한다.
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in image.as_raw() {
        histogram[v as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return u8::MAX;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_threshold: Option<u8> = None;

    for t in 0..256usize {
        weight_bg += histogram[t];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * histogram[t] as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let diff = mean_bg - mean_fg;
        let variance = weight_bg as f64 * weight_fg as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = Some(t as u8);
        }
    }

    best_threshold.unwrap_or(u8::MAX)
}

/// 임계값 이진화 (`v > threshold` → 255)
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { FOREGROUND } else { 0 };
    }
    out
}

/// Otsu 자동 이진화
pub fn binarize_otsu(image: &GrayImage) -> GrayImage {
    binarize(image, otsu_threshold(image))
}

/// 전경 비율 (0..1)
pub fn foreground_fraction(binary: &GrayImage) -> f32 {
    let raw = binary.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let fg = raw.iter().filter(|&&v| v == FOREGROUND).count();
    fg as f32 / raw.len() as f32
}

/// 반전 (255 ↔ 0)
pub fn invert(binary: &mut GrayImage) {
    for pixel in binary.pixels_mut() {
        pixel.0[0] = FOREGROUND - pixel.0[0];
    }
}

/// 전경 바운딩 박스로 타이트 크롭. 전경이 없으면 None.
pub fn crop_to_foreground(binary: &GrayImage) -> Option<GrayImage> {
    let (w, h) = binary.dimensions();
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;

    for (x, y, pixel) in binary.enumerate_pixels() {
        if pixel.0[0] == FOREGROUND {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !any || w == 0 || h == 0 {
        return None;
    }
    Some(
        image::imageops::crop_imm(binary, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
            .to_image(),
    )
}

/// 정규화 비트맵의 배경 테두리 폭
pub const GLYPH_BORDER: u32 = 1;

/// 사방에 배경(0) 테두리를 두른 사본
pub fn with_border(image: &GrayImage, border: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w + 2 * border, h + 2 * border);
    image::imageops::replace(&mut out, image, i64::from(border), i64::from(border));
    out
}

/// 템플릿 이미지 정규화.
///
/// 그레이스케일 → Otsu → 극성 정규화(흰 비율이 절반을 넘으면 반전) → 타이트 크롭 → 테두리.
/// 에셋이 밝은 배경 위 어두운 숫자든 그 반대든 같은 표현이 된다.
pub fn normalize_glyph(gray: &GrayImage) -> Option<GrayImage> {
    let mut binary = binarize_otsu(gray);
    if foreground_fraction(&binary) > 0.5 {
        invert(&mut binary);
    }
    crop_to_foreground(&binary).map(|glyph| with_border(&glyph, GLYPH_BORDER))
}

/// 프레임의 후보 영역을 매칭용 패치로 변환.
///
/// 마스크 전경 픽셀은 밝기값, 나머지는 0인 그레이 패치를 테두리와 함께 만들고
/// Otsu 이진화 → 타이트 크롭 → 테두리. 마스크가 이미 전경 극성을 정하므로 반전하지 않는다.
pub fn candidate_patch(
    frame: &RgbaImage,
    region: &Region,
    mask: &dyn ForegroundMask,
) -> Option<GrayImage> {
    if region.width == 0 || region.height == 0 {
        return None;
    }
    let b = GLYPH_BORDER;
    let mut patch = GrayImage::new(region.width + 2 * b, region.height + 2 * b);
    for dy in 0..region.height {
        for dx in 0..region.width {
            let [r, g, bl, _] = frame.get_pixel(region.x + dx, region.y + dy).0;
            if mask.is_foreground([r, g, bl]) {
                patch.put_pixel(dx + b, dy + b, Luma([luma([r, g, bl]).max(1)]));
            }
        }
    }
    crop_to_foreground(&binarize_otsu(&patch)).map(|glyph| with_border(&glyph, b))
}
