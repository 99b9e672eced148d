//! 그레이스케일 리사이즈 (fast_image_resize).

use fast_image_resize::{images::Image as FirImage, ResizeAlg, ResizeOptions, Resizer};
use flicker_core::error::CoreError;
use image::GrayImage;

/// 그레이 이미지를 지정 크기로 리사이즈 (Bilinear).
///
/// 크기가 같으면 복제만 한다.
pub fn resize_gray(image: &GrayImage, width: u32, height: u32) -> Result<GrayImage, CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::Image(format!(
            "리사이즈 목표 크기 0: {width}x{height}"
        )));
    }
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(image.clone());
    }
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::Image("빈 소스 이미지".to_string()));
    }

    let src_image = FirImage::from_vec_u8(
        src_w,
        src_h,
        image.as_raw().clone(),
        fast_image_resize::PixelType::U8,
    )
    .map_err(|e| CoreError::Image(format!("소스 이미지 생성 실패: {e}")))?;

    let mut dst_image = FirImage::new(width, height, fast_image_resize::PixelType::U8);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Image(format!("리사이즈 실패: {e}")))?;

    GrayImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| CoreError::Internal("결과 이미지 생성 실패".to_string()))
}
