//! 다중 스케일 숫자 분류기.
//!
//! 프레임 → 색상 마스크 → 연결 영역 후보 → 후보별 Otsu 패치 →
//! 스케일 × 심볼 × variant 정규화 상호상관 → 최고 점수 하나.
//!
//! 후보 수와 스케일 세트가 고정이므로 프레임당 비용 상한이 정해진다.

use flicker_core::config::ClassifierConfig;
use flicker_core::models::classification::ClassificationResult;
use flicker_core::models::frame::Frame;
use flicker_core::models::symbol::Symbol;
use flicker_core::ports::classifier::SymbolClassifier;
use image::GrayImage;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::binarize::candidate_patch;
use crate::correlation::best_correlation;
use crate::mask::{apply_mask, has_foreground, ForegroundMask};
use crate::regions::{connected_regions, RegionFilter};
use crate::resize::resize_gray;
use crate::template_bank::{Template, TemplateBank};

/// 리사이즈 템플릿 캐시 크기
const RESIZE_CACHE_CAPACITY: usize = 256;

/// 리사이즈 후 최소 변 길이 (이보다 작으면 해당 스케일 건너뜀)
const MIN_SCALED_SIDE: u32 = 2;

/// 캐시 키: (템플릿 ID, 너비, 높이)
type CacheKey = (usize, u32, u32);

/// 임계값 적용 전 최고 매칭
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    /// 평가된 템플릿이 하나도 없으면 None
    pub symbol: Option<Symbol>,
    /// 최고 NCC (평가 대상이 없으면 0.0)
    pub score: f32,
    /// 평가된 후보 수
    pub candidates: usize,
}

impl BestMatch {
    fn nothing() -> Self {
        Self {
            symbol: None,
            score: 0.0,
            candidates: 0,
        }
    }
}

/// 템플릿 매칭 기반 심볼 분류기
pub struct DigitClassifier {
    bank: Arc<TemplateBank>,
    mask: Box<dyn ForegroundMask>,
    filter: RegionFilter,
    scales: Vec<f32>,
    accept_threshold: f32,
    resize_cache: Mutex<LruCache<CacheKey, Arc<GrayImage>>>,
}

impl DigitClassifier {
    pub fn new(
        bank: Arc<TemplateBank>,
        mask: Box<dyn ForegroundMask>,
        config: &ClassifierConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(RESIZE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            bank,
            mask,
            filter: RegionFilter::from_config(config),
            scales: config.scales.clone(),
            accept_threshold: config.accept_threshold,
            resize_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// 수용 임계값 변경 (매칭 자체에는 영향 없음)
    pub fn with_threshold(mut self, accept_threshold: f32) -> Self {
        self.accept_threshold = accept_threshold;
        self
    }

    pub fn accept_threshold(&self) -> f32 {
        self.accept_threshold
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    /// 임계값 적용 전 최고 (심볼, 점수).
    ///
    /// 동점이면 먼저 평가된 쪽(후보 면적순 → 스케일 순 → 알파벳/variant 순)이 남는다.
    pub fn best_match(&self, frame: &Frame) -> BestMatch {
        if frame.is_empty() || self.bank.is_empty() {
            return BestMatch::nothing();
        }

        let mask = apply_mask(&frame.image, self.mask.as_ref());
        if !has_foreground(&mask) {
            trace!("전경 없음: 매칭 생략");
            return BestMatch::nothing();
        }

        let candidates = self.filter.select(connected_regions(&mask));
        let mut best: Option<(&Symbol, f32)> = None;
        let mut evaluated = 0;

        for region in &candidates {
            let Some(patch) = candidate_patch(&frame.image, region, self.mask.as_ref()) else {
                continue;
            };
            evaluated += 1;

            for &scale in &self.scales {
                let Some(scaled) = self.scale_patch(&patch, scale) else {
                    continue;
                };
                let (cw, ch) = scaled.dimensions();

                for template in self.bank.iter() {
                    let Some(fitted) = self.fit_template(template, cw, ch) else {
                        continue;
                    };
                    let Some(score) = best_correlation(&scaled, &fitted) else {
                        continue;
                    };
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((&template.symbol, score));
                    }
                }
            }
        }

        match best {
            Some((symbol, score)) => BestMatch {
                symbol: Some(symbol.clone()),
                score,
                candidates: evaluated,
            },
            None => BestMatch {
                candidates: evaluated,
                ..BestMatch::nothing()
            },
        }
    }

    /// 후보 패치를 스케일만큼 리사이즈. 크기가 너무 작아지면 None.
    fn scale_patch(&self, patch: &GrayImage, scale: f32) -> Option<GrayImage> {
        let (w, h) = patch.dimensions();
        let sw = (w as f32 * scale).round() as u32;
        let sh = (h as f32 * scale).round() as u32;
        if sw < MIN_SCALED_SIDE || sh < MIN_SCALED_SIDE {
            return None;
        }
        match resize_gray(patch, sw, sh) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("후보 리사이즈 실패: {e}");
                None
            }
        }
    }

    /// 템플릿이 후보보다 크면 후보 안에 들어가도록 비율 유지 축소 (LRU 캐시)
    fn fit_template(&self, template: &Template, width: u32, height: u32) -> Option<Arc<GrayImage>> {
        let (tw, th) = template.bitmap.dimensions();
        if tw <= width && th <= height {
            return self.cached(template, tw, th);
        }
        let factor = (width as f32 / tw as f32).min(height as f32 / th as f32);
        let nw = ((tw as f32 * factor).floor() as u32).clamp(1, width);
        let nh = ((th as f32 * factor).floor() as u32).clamp(1, height);
        self.cached(template, nw, nh)
    }

    fn cached(&self, template: &Template, width: u32, height: u32) -> Option<Arc<GrayImage>> {
        let key = (template.id, width, height);
        if let Some(hit) = self.resize_cache.lock().get(&key) {
            return Some(Arc::clone(hit));
        }

        let resized = match resize_gray(&template.bitmap, width, height) {
            Ok(img) => Arc::new(img),
            Err(e) => {
                warn!(symbol = %template.symbol, "템플릿 리사이즈 실패: {e}");
                return None;
            }
        };
        self.resize_cache.lock().put(key, Arc::clone(&resized));
        Some(resized)
    }
}

impl SymbolClassifier for DigitClassifier {
    fn classify(&self, frame: &Frame) -> ClassificationResult {
        let best = self.best_match(frame);
        match best.symbol {
            Some(symbol) if best.score >= self.accept_threshold => {
                debug!(symbol = %symbol, score = best.score, "심볼 검출");
                ClassificationResult::found(symbol, best.score, frame.captured_at)
            }
            _ => {
                trace!(score = best.score, candidates = best.candidates, "심볼 없음");
                ClassificationResult::not_found(best.score, frame.captured_at)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::mask_from_spec;
    use flicker_core::models::classification::Classification;
    use image::{Luma, Rgba, RgbaImage};

    const W: u32 = 20;
    const H: u32 = 30;
    const YELLOW: Rgba<u8> = Rgba([255, 220, 0, 255]);
    const BACKGROUND: Rgba<u8> = Rgba([20, 20, 30, 255]);

    fn rect(cells: &mut Vec<(u32, u32)>, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                cells.push((x, y));
            }
        }
    }

    /// 20x30 캔버스 기준 글리프 픽셀 (획 3, 바운딩 박스 x 3..=17, y 3..=27)
    fn glyph_cells(symbol: &str) -> Vec<(u32, u32)> {
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

    fn exemplar(symbol: &str) -> GrayImage {
        let mut img = GrayImage::new(W, H);
        for (x, y) in glyph_cells(symbol) {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    fn frame_with(symbol: &str, ox: u32, oy: u32) -> Frame {
        let mut img = RgbaImage::from_pixel(120, 80, BACKGROUND);
        for (x, y) in glyph_cells(symbol) {
            img.put_pixel(ox + x, oy + y, YELLOW);
        }
        Frame::new(img)
    }

    fn bank(symbols: &[&str]) -> Arc<TemplateBank> {
        let alphabet: Vec<Symbol> = ["1", "2", "3", "4"].into_iter().map(Symbol::new).collect();
        let exemplars = symbols
            .iter()
            .map(|s| (Symbol::new(*s), exemplar(s)))
            .collect();
        Arc::new(TemplateBank::from_exemplars(&alphabet, exemplars))
    }

    fn classifier(symbols: &[&str]) -> DigitClassifier {
        let config = ClassifierConfig::default();
        DigitClassifier::new(bank(symbols), mask_from_spec(&config.mask), &config)
    }

    #[test]
    fn recognizes_each_glyph() {
        let classifier = classifier(&["1", "2", "3", "4"]);
        for symbol in ["1", "2", "3", "4"] {
            let result = classifier.classify(&frame_with(symbol, 40, 20));
            match result.classification {
                Classification::Found { symbol: found, score } => {
                    assert_eq!(found.as_str(), symbol);
                    assert!(score > 0.99, "{symbol}: {score}");
                }
                other => panic!("{symbol}: {other:?}"),
            }
        }
    }

    #[test]
    fn empty_mask_short_circuits() {
        let classifier = classifier(&["1", "2", "3", "4"]);
        let frame = Frame::new(RgbaImage::from_pixel(64, 64, BACKGROUND));
        let best = classifier.best_match(&frame);
        assert_eq!(best, BestMatch::nothing());

        let result = classifier.classify(&frame);
        assert_eq!(result.classification, Classification::NotFound { score: 0.0 });
        assert_eq!(result.frame_timestamp, frame.captured_at);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = classifier(&["1", "2", "3", "4"]);
        let frame = frame_with("2", 10, 5);
        let first = classifier.classify(&frame);
        for _ in 0..3 {
            assert_eq!(classifier.classify(&frame), first);
        }
    }

    #[test]
    fn raising_threshold_only_rejects() {
        // "3" 템플릿이 없으므로 최고 점수는 1보다 작다
        let frame = frame_with("3", 30, 30);
        let score = classifier(&["1", "2", "4"]).best_match(&frame).score;
        assert!(score < 0.999);

        let at_score = classifier(&["1", "2", "4"]).with_threshold(score);
        assert!(at_score.classify(&frame).classification.is_found());

        let above = classifier(&["1", "2", "4"]).with_threshold(score + 0.001);
        assert_eq!(
            above.classify(&frame).classification,
            Classification::NotFound { score }
        );
    }

    #[test]
    fn symbol_without_templates_is_never_returned() {
        let classifier = classifier(&["1", "2", "4"]).with_threshold(-1.0);
        assert_eq!(classifier.bank().empty_symbols(), vec![&Symbol::new("3")]);

        let result = classifier.classify(&frame_with("3", 40, 20));
        assert_ne!(result.classification.symbol(), Some(&Symbol::new("3")));
    }

    #[test]
    fn noise_outside_bands_is_ignored() {
        let classifier = classifier(&["1", "2", "3", "4"]);
        let mut frame = frame_with("1", 40, 20);
        // 너무 작은 점과 납작한 막대
        frame.image.put_pixel(2, 2, YELLOW);
        for x in 0..60 {
            frame.image.put_pixel(x, 78, YELLOW);
        }
        let result = classifier.classify(&frame);
        assert_eq!(result.classification.symbol(), Some(&Symbol::new("1")));
    }

    #[test]
    fn solid_bar_glyph_is_recognized() {
        // 픽셀 폰트식 "1": 속이 꽉 찬 4x14 세로 막대
        let bar = |img_w: u32, img_h: u32| {
            GrayImage::from_fn(img_w, img_h, |x, y| {
                if (3..7).contains(&x) && (3..17).contains(&y) {
                    Luma([255])
                } else {
                    Luma([0])
                }
            })
        };
        let alphabet: Vec<Symbol> = ["1", "2", "3", "4"].into_iter().map(Symbol::new).collect();
        let mut exemplars = vec![(Symbol::new("1"), bar(10, 20))];
        exemplars.extend(["2", "3", "4"].into_iter().map(|s| (Symbol::new(s), exemplar(s))));
        let bank = TemplateBank::from_exemplars(&alphabet, exemplars);
        assert!(bank.empty_symbols().is_empty());

        let config = ClassifierConfig::default();
        let mask = mask_from_spec(&config.mask);
        let classifier = DigitClassifier::new(Arc::new(bank), mask, &config);

        let mut img = RgbaImage::from_pixel(120, 80, BACKGROUND);
        for y in 30..44 {
            for x in 50..54 {
                img.put_pixel(x, y, YELLOW);
            }
        }
        match classifier.classify(&Frame::new(img)).classification {
            Classification::Found { symbol, score } => {
                assert_eq!(symbol.as_str(), "1");
                assert!(score > 0.99, "{score}");
            }
            other => panic!("bar: {other:?}"),
        }
    }

    #[test]
    fn larger_templates_are_fitted_to_candidate() {
        // 템플릿은 2배 크기로 그리고, 프레임에는 원래 크기로 그린다
        let alphabet: Vec<Symbol> = ["1", "2", "3", "4"].into_iter().map(Symbol::new).collect();
        let exemplars = ["1", "2", "3", "4"]
            .into_iter()
            .map(|s| {
                let small = exemplar(s);
                let big = GrayImage::from_fn(W * 2, H * 2, |x, y| *small.get_pixel(x / 2, y / 2));
                (Symbol::new(s), big)
            })
            .collect();
        let config = ClassifierConfig::default();
        let classifier = DigitClassifier::new(
            Arc::new(TemplateBank::from_exemplars(&alphabet, exemplars)),
            mask_from_spec(&config.mask),
            &config,
        );

        let result = classifier.classify(&frame_with("3", 40, 20));
        assert_eq!(result.classification.symbol(), Some(&Symbol::new("3")));
    }
}
