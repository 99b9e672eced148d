//! 리플레이 프레임 소스.
//!
//! 디렉토리의 이미지 파일을 파일명 순서로 재생한다. 임계값 튜닝과 오프라인 검증용.

use flicker_core::error::CoreError;
use flicker_core::models::frame::Frame;
use flicker_core::ports::frame_source::FrameSource;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 지원 확장자
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// 디렉토리 기반 프레임 소스
pub struct ReplayFrameSource {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ReplayFrameSource {
    /// 디렉토리 스캔 (이미지 확장자만, 파일명 정렬)
    pub fn open(dir: &Path) -> Result<Self, CoreError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CoreError::Config(format!("리플레이 디렉토리 읽기 실패: {}: {e}", dir.display()))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        files.sort();

        info!(count = files.len(), dir = %dir.display(), "리플레이 프레임 로드");
        Ok(Self { files, cursor: 0 })
    }

    /// 남은 프레임 수
    pub fn remaining(&self) -> usize {
        self.files.len().saturating_sub(self.cursor)
    }
}

impl FrameSource for ReplayFrameSource {
    fn capture(&mut self) -> Result<Frame, CoreError> {
        let path = self
            .files
            .get(self.cursor)
            .ok_or_else(|| CoreError::Capture("리플레이 프레임 소진".to_string()))?
            .clone();
        self.cursor += 1;

        let image = image::open(&path)
            .map_err(|e| CoreError::Capture(format!("프레임 디코딩 실패: {}: {e}", path.display())))?
            .to_rgba8();
        debug!(frame = %path.display(), "리플레이 프레임");
        Ok(Frame::new(image))
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// 이미지 확장자 여부 (대소문자 무시)
pub(crate) fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn replays_in_name_order_then_errors() {
        let dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([10, 0, 0, 255]))
            .save(dir.path().join("002.png"))
            .unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([20, 0, 0, 255]))
            .save(dir.path().join("001.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut source = ReplayFrameSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.capture().unwrap();
        assert_eq!(first.image.get_pixel(0, 0)[0], 20);
        let second = source.capture().unwrap();
        assert_eq!(second.image.get_pixel(0, 0)[0], 10);

        assert!(source.is_exhausted());
        assert!(matches!(source.capture(), Err(CoreError::Capture(_))));
    }

    #[test]
    fn missing_directory_is_config_error() {
        let err = ReplayFrameSource::open(Path::new("/definitely/not/here")).err();
        assert!(matches!(err, Some(CoreError::Config(_))));
    }
}
