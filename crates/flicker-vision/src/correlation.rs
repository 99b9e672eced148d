//! 정규화 상호상관 (zero-mean NCC).
//!
//! 템플릿을 이미지 위에서 슬라이딩하며 위치별 상관계수를 계산하고 최댓값을 반환한다.
//! 점수 범위는 [-1, 1]. 분산이 0인 창(평탄한 패치)은 0점.

use image::GrayImage;

/// 템플릿이 이미지 안에 들어가는 모든 위치에서의 최대 NCC.
///
/// 템플릿이 이미지보다 크거나 비어 있으면 None.
pub fn best_correlation(image: &GrayImage, template: &GrayImage) -> Option<f32> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = (tw * th) as f64;
    let t_raw = template.as_raw();
    let t_mean = t_raw.iter().map(|&v| v as f64).sum::<f64>() / n;
    let t_dev: Vec<f64> = t_raw.iter().map(|&v| v as f64 - t_mean).collect();
    let t_energy: f64 = t_dev.iter().map(|d| d * d).sum();

    let raw = image.as_raw();
    let (iw, tw, th) = (iw as usize, tw as usize, th as usize);
    let mut best = f64::NEG_INFINITY;

    for oy in 0..=(ih as usize - th) {
        for ox in 0..=(iw - tw) {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            let mut cross = 0.0f64;
            for ty in 0..th {
                let row = (oy + ty) * iw + ox;
                let t_row = ty * tw;
                for tx in 0..tw {
                    let v = raw[row + tx] as f64;
                    sum += v;
                    sum_sq += v * v;
                    // t_dev 합이 0이므로 창 평균을 빼지 않아도 같은 값
                    cross += v * t_dev[t_row + tx];
                }
            }
            let i_energy = (sum_sq - sum * sum / n).max(0.0);
            let denom = (t_energy * i_energy).sqrt();
            let score = if denom <= f64::EPSILON {
                0.0
            } else {
                cross / denom
            };
            if score > best {
                best = score;
            }
        }
    }

    Some(best.clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checker(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn identical_scores_one() {
        let img = checker(6, 6);
        let score = best_correlation(&img, &img).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inverted_scores_minus_one() {
        let img = checker(4, 4);
        let mut inv = img.clone();
        for p in inv.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
        let score = best_correlation(&img, &inv).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn finds_template_inside_larger_image() {
        let mut img = GrayImage::new(12, 12);
        let tpl = GrayImage::from_fn(3, 3, |x, y| Luma([if x == 1 || y == 1 { 255 } else { 0 }]));
        for y in 0..3 {
            for x in 0..3 {
                img.put_pixel(7 + x, 4 + y, *tpl.get_pixel(x, y));
            }
        }
        let score = best_correlation(&img, &tpl).unwrap();
        assert!(score > 0.999);
    }

    #[test]
    fn flat_patch_scores_zero() {
        let flat = GrayImage::from_pixel(5, 5, Luma([255]));
        let tpl = checker(3, 3);
        assert_eq!(best_correlation(&flat, &tpl), Some(0.0));
    }

    #[test]
    fn oversized_template_is_none() {
        let img = checker(3, 3);
        let tpl = checker(4, 2);
        assert!(best_correlation(&img, &tpl).is_none());
    }
}
