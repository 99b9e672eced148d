//! 스크린 캡처.
//!
//! xcap 기반 모니터 캡처 + 뷰포트 영역 크롭. `FrameSource` 포트 구현.

use flicker_core::config::{CaptureConfig, CaptureRegion};
use flicker_core::error::CoreError;
use flicker_core::models::frame::Frame;
use flicker_core::ports::frame_source::FrameSource;
use image::RgbaImage;
use tracing::{debug, trace};
use xcap::Monitor;

/// 한 번 해석한 값을 무효화 전까지 재사용하는 슬롯
#[derive(Debug)]
pub struct ResolvedSlot<T> {
    value: Option<T>,
}

impl<T: Clone> ResolvedSlot<T> {
    pub fn new() -> Self {
        Self { value: None }
    }

    /// 캐시된 값, 없으면 `resolve`로 해석해 저장
    pub fn get_or_resolve<F>(&mut self, resolve: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Result<T, CoreError>,
    {
        if let Some(value) = &self.value {
            return Ok(value.clone());
        }
        let value = resolve()?;
        self.value = Some(value.clone());
        Ok(value)
    }

    pub fn invalidate(&mut self) {
        self.value = None;
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Clone> Default for ResolvedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 스크린 캡처: xcap 기반
///
/// 모니터는 첫 캡처에서 한 번 해석하고 캡처 실패 시에만 다시 해석한다.
/// Windows의 xcap 모니터 핸들은 `Send`가 아니므로 그 플랫폼에서는 매번 해석한다.
pub struct ScreenCapture {
    /// 모니터 인덱스 (None이면 주 모니터)
    monitor_index: Option<usize>,
    /// 뷰포트 크롭 영역
    region: Option<CaptureRegion>,
    #[cfg(not(target_os = "windows"))]
    monitor: ResolvedSlot<Monitor>,
}

impl ScreenCapture {
    /// 새 캡처 인스턴스 생성
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            monitor_index: config.monitor_index,
            region: config.region,
            #[cfg(not(target_os = "windows"))]
            monitor: ResolvedSlot::new(),
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn monitor(&mut self) -> Result<Monitor, CoreError> {
        let index = self.monitor_index;
        self.monitor.get_or_resolve(|| select_monitor(index))
    }

    #[cfg(target_os = "windows")]
    fn monitor(&mut self) -> Result<Monitor, CoreError> {
        select_monitor(self.monitor_index)
    }

    fn forget_monitor(&mut self) {
        #[cfg(not(target_os = "windows"))]
        self.monitor.invalidate();
    }
}

fn select_monitor(monitor_index: Option<usize>) -> Result<Monitor, CoreError> {
    let monitors =
        Monitor::all().map_err(|e| CoreError::Capture(format!("모니터 목록 조회 실패: {e}")))?;

    let monitor = match monitor_index {
        Some(index) => monitors
            .into_iter()
            .nth(index)
            .ok_or_else(|| CoreError::Capture(format!("모니터 인덱스 {index} 없음")))?,
        None => {
            let mut fallback = None;
            let mut primary = None;
            for monitor in monitors {
                if monitor.is_primary().unwrap_or(false) {
                    primary = Some(monitor);
                    break;
                }
                if fallback.is_none() {
                    fallback = Some(monitor);
                }
            }
            primary
                .or(fallback)
                .ok_or_else(|| CoreError::Capture("모니터를 찾을 수 없음".to_string()))?
        }
    };
    debug!(name = %monitor.name().unwrap_or_default(), "캡처 모니터 해석");
    Ok(monitor)
}

impl FrameSource for ScreenCapture {
    fn capture(&mut self) -> Result<Frame, CoreError> {
        let monitor = self.monitor()?;
        let image = match monitor.capture_image() {
            Ok(image) => image,
            Err(e) => {
                // 모니터 구성이 바뀌었을 수 있으므로 다음 캡처에서 다시 해석
                self.forget_monitor();
                return Err(CoreError::Capture(format!("스크린 캡처 실패: {e}")));
            }
        };

        let image = match self.region {
            Some(region) => crop_region(&image, region)?,
            None => image,
        };

        trace!("스크린 캡처 완료: {}x{}", image.width(), image.height());
        Ok(Frame::new(image))
    }

    fn name(&self) -> &str {
        "xcap"
    }
}

/// 캡처 이미지에서 뷰포트 영역 잘라내기 (이미지 경계로 클램프)
pub fn crop_region(image: &RgbaImage, region: CaptureRegion) -> Result<RgbaImage, CoreError> {
    let (w, h) = image.dimensions();
    if region.x >= w || region.y >= h {
        return Err(CoreError::Capture(format!(
            "캡처 영역이 화면 밖: ({}, {}) / {}x{}",
            region.x, region.y, w, h
        )));
    }
    let width = region.width.min(w - region.x);
    let height = region.height.min(h - region.y);
    if width == 0 || height == 0 {
        return Err(CoreError::Capture("캡처 영역 크기 0".to_string()));
    }
    Ok(image::imageops::crop_imm(image, region.x, region.y, width, height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn slot_resolves_once_until_invalidated() {
        let mut slot = ResolvedSlot::new();
        let mut calls = 0;
        for _ in 0..3 {
            let v = slot
                .get_or_resolve(|| {
                    calls += 1;
                    Ok(7u32)
                })
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls, 1);

        slot.invalidate();
        assert!(!slot.is_resolved());
        slot.get_or_resolve(|| {
            calls += 1;
            Ok(8u32)
        })
        .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn slot_failure_is_not_cached() {
        let mut slot: ResolvedSlot<u32> = ResolvedSlot::default();
        let err = slot.get_or_resolve(|| Err(CoreError::Capture("no monitor".to_string())));
        assert!(matches!(err, Err(CoreError::Capture(_))));
        assert!(!slot.is_resolved());
        assert_eq!(slot.get_or_resolve(|| Ok(3)).unwrap(), 3);
    }

    #[test]
    fn crop_inside_bounds() {
        let mut img = RgbaImage::new(100, 80);
        img.put_pixel(12, 7, Rgba([255, 0, 0, 255]));
        let region = CaptureRegion {
            x: 10,
            y: 5,
            width: 20,
            height: 10,
        };
        let cropped = crop_region(&img, region).unwrap();
        assert_eq!(cropped.dimensions(), (20, 10));
        assert_eq!(cropped.get_pixel(2, 2), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn crop_clamped_to_image() {
        let img = RgbaImage::new(50, 50);
        let region = CaptureRegion {
            x: 40,
            y: 40,
            width: 100,
            height: 100,
        };
        assert_eq!(crop_region(&img, region).unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn crop_outside_is_error() {
        let img = RgbaImage::new(50, 50);
        let region = CaptureRegion {
            x: 60,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(matches!(
            crop_region(&img, region),
            Err(CoreError::Capture(_))
        ));
    }
}
