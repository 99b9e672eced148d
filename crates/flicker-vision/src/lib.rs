//! # flicker-vision
//!
//! 프레임 → 심볼 분류 파이프라인.
//! 스크린 캡처, 전경 색상 마스크, Otsu 이진화, 연결 영역 추출,
//! 템플릿 뱅크 로드, 다중 스케일 정규화 상호상관 매칭을 담당한다.

pub mod binarize;
pub mod capture;
pub mod classifier;
pub mod correlation;
pub mod mask;
pub mod regions;
pub mod replay;
pub mod resize;
pub mod template_bank;
