//! 연결 영역 추출 + 후보 필터.

use flicker_core::config::ClassifierConfig;
use image::GrayImage;

use crate::mask::FOREGROUND;

/// 이진 마스크의 8-연결 영역 (바운딩 박스)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// 영역에 속한 전경 픽셀 수
    pub pixel_count: u32,
}

impl Region {
    /// 바운딩 박스 면적
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// 높이 / 너비
    pub fn aspect(&self) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f32 / self.width as f32
    }
}

/// 8-연결 영역 추출 (스택 기반 flood fill, 행 우선 스캔 순서)
pub fn connected_regions(mask: &GrayImage) -> Vec<Region> {
    let (w, h) = mask.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let raw = mask.as_raw();
    let mut visited = vec![false; wu * hu];
    let mut regions = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..wu * hu {
        if visited[start] || raw[start] != FOREGROUND {
            continue;
        }
        visited[start] = true;
        stack.push((start % wu, start / wu));

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut count = 0u32;

        while let Some((x, y)) = stack.pop() {
            count += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= wu as i64 || ny >= hu as i64 {
                        continue;
                    }
                    let idx = ny as usize * wu + nx as usize;
                    if !visited[idx] && raw[idx] == FOREGROUND {
                        visited[idx] = true;
                        stack.push((nx as usize, ny as usize));
                    }
                }
            }
        }

        regions.push(Region {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
            pixel_count: count,
        });
    }

    regions
}

/// 면적/종횡비 대역 필터 + 면적 내림차순 상위 N개
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    pub min_area: u32,
    pub max_area: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub max_candidates: usize,
}

impl RegionFilter {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            min_area: config.min_area,
            max_area: config.max_area,
            min_aspect: config.min_aspect,
            max_aspect: config.max_aspect,
            max_candidates: config.max_candidates,
        }
    }

    pub fn accepts(&self, region: &Region) -> bool {
        let area = region.area();
        let aspect = region.aspect();
        area >= self.min_area
            && area <= self.max_area
            && aspect >= self.min_aspect
            && aspect <= self.max_aspect
    }

    /// 대역 통과 영역을 면적 내림차순으로 최대 `max_candidates`개 선택.
    /// 같은 면적은 스캔 순서를 유지한다.
    pub fn select(&self, regions: Vec<Region>) -> Vec<Region> {
        let mut kept: Vec<Region> = regions.into_iter().filter(|r| self.accepts(r)).collect();
        kept.sort_by(|a, b| b.area().cmp(&a.area()));
        kept.truncate(self.max_candidates);
        kept
    }
}
