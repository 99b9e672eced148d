//! 분류 결과 모델.

use std::time::Instant;

use super::symbol::Symbol;

/// 단일 프레임 분류 결과.
///
/// "심볼 없음"을 별도 변형으로 분리해 호출자가 미검출 경우를 빠뜨리지 않도록 한다.
/// 두 변형 모두 진단용 최고 점수를 함께 담는다.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// 수용 임계값 이상으로 매칭된 심볼
    Found { symbol: Symbol, score: f32 },
    /// 임계값 미달 또는 후보 없음 (score는 관측된 최고 점수, 평가 대상이 없으면 0.0)
    NotFound { score: f32 },
}

impl Classification {
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Found { symbol, .. } => Some(symbol),
            Self::NotFound { .. } => None,
        }
    }

    pub fn score(&self) -> f32 {
        match self {
            Self::Found { score, .. } | Self::NotFound { score } => *score,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// 분류 결과 + 프레임 캡처 시각. 호출마다 새로 생성되며 변경되지 않는다.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub frame_timestamp: Instant,
}

impl ClassificationResult {
    pub fn found(symbol: Symbol, score: f32, frame_timestamp: Instant) -> Self {
        Self {
            classification: Classification::Found { symbol, score },
            frame_timestamp,
        }
    }

    pub fn not_found(score: f32, frame_timestamp: Instant) -> Self {
        Self {
            classification: Classification::NotFound { score },
            frame_timestamp,
        }
    }
}
