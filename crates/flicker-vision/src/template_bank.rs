//! 템플릿 뱅크.
//!
//! 심볼별 정규화 참조 비트맵(variant) 모음. 시작 시 한 번 로드되고 이후 읽기 전용이다.
//! 파일명 접두사가 심볼을 결정한다 (`3_small.png`, `3-alt.png` → "3").

use flicker_core::error::CoreError;
use flicker_core::models::symbol::Symbol;
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::binarize::normalize_glyph;
use crate::replay::is_image_file;

/// 정규화된 참조 비트맵
#[derive(Debug, Clone)]
pub struct Template {
    /// 뱅크 내 고유 ID (리사이즈 캐시 키)
    pub id: usize,
    pub symbol: Symbol,
    /// 같은 심볼 내 variant 순번
    pub variant: usize,
    /// 원본 파일 (메모리 예시에서 만든 경우 None)
    pub source: Option<PathBuf>,
    /// 전경 255 / 배경 0, 타이트 크롭
    pub bitmap: GrayImage,
}

/// 심볼 → variant 목록
#[derive(Debug, Clone, Default)]
pub struct TemplateBank {
    alphabet: Vec<Symbol>,
    /// 알파벳 순서, 그 안에서 variant 순서 (= 평가 순서)
    templates: Vec<Template>,
}

impl TemplateBank {
    /// 디렉토리에서 알파벳의 템플릿 로드.
    ///
    /// 디렉토리가 없으면 에러. 개별 파일 실패는 경고 후 건너뛰고,
    /// variant가 하나도 없는 심볼은 경고 한 번과 함께 매칭 불가로 남는다.
    pub fn load(dir: &Path, alphabet: &[Symbol]) -> Result<Self, CoreError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CoreError::Template(format!("템플릿 디렉토리 읽기 실패: {}: {e}", dir.display()))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        files.sort();

        let mut exemplars = Vec::new();
        for path in files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(symbol) = symbol_for_file(name, alphabet) else {
                debug!(file = %path.display(), "알파벳에 해당하지 않는 템플릿 파일 무시");
                continue;
            };
            match image::open(&path) {
                Ok(img) => exemplars.push((symbol.clone(), img.to_luma8(), Some(path))),
                Err(e) => warn!(file = %path.display(), "템플릿 디코딩 실패: {e}"),
            }
        }

        let bank = Self::build(alphabet, exemplars);
        info!(
            templates = bank.template_count(),
            symbols = alphabet.len(),
            dir = %dir.display(),
            "템플릿 뱅크 로드 완료"
        );
        Ok(bank)
    }

    /// 메모리 예시 이미지(그레이스케일)로 뱅크 생성
    pub fn from_exemplars(alphabet: &[Symbol], exemplars: Vec<(Symbol, GrayImage)>) -> Self {
        let exemplars = exemplars
            .into_iter()
            .map(|(symbol, img)| (symbol, img, None))
            .collect();
        Self::build(alphabet, exemplars)
    }

    fn build(alphabet: &[Symbol], exemplars: Vec<(Symbol, GrayImage, Option<PathBuf>)>) -> Self {
        let mut templates = Vec::new();

        for symbol in alphabet {
            let mut variant = 0;
            for (owner, img, source) in exemplars.iter().filter(|(s, _, _)| s == symbol) {
                let Some(bitmap) = normalize_glyph(img) else {
                    warn!(symbol = %owner, source = ?source, "전경이 없는 템플릿 무시");
                    continue;
                };
                templates.push(Template {
                    id: templates.len(),
                    symbol: owner.clone(),
                    variant,
                    source: source.clone(),
                    bitmap,
                });
                variant += 1;
            }
            if variant == 0 {
                warn!(symbol = %symbol, "템플릿 없음: 이 심볼은 매칭되지 않음");
            }
        }

        for (symbol, _, source) in &exemplars {
            if !alphabet.contains(symbol) {
                warn!(symbol = %symbol, source = ?source, "알파벳 밖 심볼의 템플릿 무시");
            }
        }

        Self {
            alphabet: alphabet.to_vec(),
            templates,
        }
    }

    /// 심볼의 variant 목록 (로드 순서)
    pub fn variants<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a Template> + 'a {
        self.templates.iter().filter(move |t| &t.symbol == symbol)
    }

    /// 전체 템플릿 (평가 순서)
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    /// variant가 없는 심볼
    pub fn empty_symbols(&self) -> Vec<&Symbol> {
        self.alphabet
            .iter()
            .filter(|s| self.variants(s).next().is_none())
            .collect()
    }

    pub fn alphabet(&self) -> &[Symbol] {
        &self.alphabet
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// 파일명에 접두사로 일치하는 가장 긴 심볼 ("10" 과 "1"이 공존해도 구분)
fn symbol_for_file<'a>(file_name: &str, alphabet: &'a [Symbol]) -> Option<&'a Symbol> {
    alphabet
        .iter()
        .filter(|s| file_name.starts_with(s.as_str()))
        .max_by_key(|s| s.as_str().len())
}
