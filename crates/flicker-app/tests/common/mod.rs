//! 통합 테스트 공용 헬퍼.
//!
//! 합성 글리프 이미지, 스크립트 프레임 소스/분류기, 기록용 액션 싱크.

#![allow(dead_code)]

use async_trait::async_trait;
use flicker_core::error::CoreError;
use flicker_core::models::classification::ClassificationResult;
use flicker_core::models::frame::Frame;
use flicker_core::models::symbol::{ActionKind, Symbol};
use flicker_core::ports::action_sink::ActionSink;
use flicker_core::ports::classifier::SymbolClassifier;
use flicker_core::ports::frame_source::FrameSource;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const GLYPH_W: u32 = 20;
pub const GLYPH_H: u32 = 30;
pub const YELLOW: Rgba<u8> = Rgba([255, 220, 0, 255]);
pub const BACKGROUND: Rgba<u8> = Rgba([20, 20, 30, 255]);

fn rect(cells: &mut Vec<(u32, u32)>, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            cells.push((x, y));
        }
    }
}

/// 20x30 캔버스 기준 숫자 글리프 픽셀 (획 3)
pub fn glyph_cells(symbol: &str) -> Vec<(u32, u32)> {
    let mut c = Vec::new();
    match symbol {
        "1" => {
            rect(&mut c, 9, 3, 11, 27);
            rect(&mut c, 3, 3, 11, 5);
            rect(&mut c, 3, 25, 17, 27);
        }
        "2" => {
            rect(&mut c, 3, 3, 17, 5);
            rect(&mut c, 15, 3, 17, 16);
            rect(&mut c, 3, 14, 17, 16);
            rect(&mut c, 3, 14, 5, 27);
            rect(&mut c, 3, 25, 17, 27);
        }
        "3" => {
            rect(&mut c, 3, 3, 17, 5);
            rect(&mut c, 7, 14, 17, 16);
            rect(&mut c, 3, 25, 17, 27);
            rect(&mut c, 15, 3, 17, 27);
        }
        "4" => {
            rect(&mut c, 3, 3, 5, 16);
            rect(&mut c, 3, 14, 17, 16);
            rect(&mut c, 15, 3, 17, 27);
        }
        other => panic!("no glyph for {other}"),
    }
    c
}

/// 흰 글리프 / 검은 배경 템플릿 이미지
pub fn template_image(symbol: &str) -> GrayImage {
    let mut img = GrayImage::new(GLYPH_W, GLYPH_H);
    for (x, y) in glyph_cells(symbol) {
        img.put_pixel(x, y, Luma([255]));
    }
    img
}

/// 어두운 HUD 위 노란 숫자 프레임 (None이면 빈 HUD)
pub fn hud_frame(symbol: Option<&str>) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(120, 80, BACKGROUND);
    if let Some(symbol) = symbol {
        for (x, y) in glyph_cells(symbol) {
            img.put_pixel(40 + x, 20 + y, YELLOW);
        }
    }
    img
}

/// 일정 간격 시각의 빈 프레임을 내보내는 소스
pub struct TimedSource {
    frames: VecDeque<Instant>,
}

impl TimedSource {
    pub fn new(start: Instant, count: usize, spacing: Duration) -> Self {
        Self {
            frames: (0..count as u32).map(|i| start + spacing * i).collect(),
        }
    }
}

impl FrameSource for TimedSource {
    fn capture(&mut self) -> Result<Frame, CoreError> {
        self.frames
            .pop_front()
            .map(|at| Frame::captured_at(RgbaImage::new(4, 4), at))
            .ok_or_else(|| CoreError::Capture("end of script".to_string()))
    }

    fn name(&self) -> &str {
        "timed"
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}

/// 정해진 심볼 순서를 돌려주는 분류기 (점수 0.9)
pub struct ScriptedClassifier {
    symbols: Mutex<VecDeque<&'static str>>,
}

impl ScriptedClassifier {
    pub fn new(symbols: &[&'static str]) -> Self {
        Self {
            symbols: Mutex::new(symbols.iter().copied().collect()),
        }
    }
}

impl SymbolClassifier for ScriptedClassifier {
    fn classify(&self, frame: &Frame) -> ClassificationResult {
        match self.symbols.lock().pop_front() {
            Some(s) => ClassificationResult::found(Symbol::new(s), 0.9, frame.captured_at),
            None => ClassificationResult::not_found(0.0, frame.captured_at),
        }
    }
}

/// 발사된 액션 종류를 순서대로 기록
#[derive(Default)]
pub struct RecordingSink {
    pub fired: Mutex<Vec<ActionKind>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<String> {
        self.fired.lock().iter().map(|k| k.to_string()).collect()
    }
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn fire(&self, action_kind: &ActionKind) -> Result<(), CoreError> {
        self.fired.lock().push(action_kind.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn symbols(list: &[&str]) -> Vec<Symbol> {
    list.iter().map(|s| Symbol::new(*s)).collect()
}
