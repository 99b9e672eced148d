//! 지연 보정 모델.
//!
//! 액션 종류별로 "검출 → 이상적인 발사 시점" 지연 샘플 창을 유지하고
//! 항상 창의 중앙값을 현재 추정치로 노출한다.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::symbol::ActionKind;

/// 액션 종류별 지연 추정치.
///
/// 불변식: `delay_ms`는 항상 `samples`의 중앙값이며 0 이상으로 클램프된다.
/// 샘플이 없으면 `delay_ms`는 생성 시 주어진 기본값이다.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayEstimate {
    pub action_kind: ActionKind,
    delay_ms: f64,
    /// 누적 기록 샘플 수 (창에서 밀려난 샘플 포함)
    sample_count: u64,
    samples: VecDeque<f64>,
    default_delay_ms: f64,
}

impl DelayEstimate {
    /// 샘플 없는 추정치 생성
    pub fn new(action_kind: ActionKind, default_delay_ms: f64) -> Self {
        let default_delay_ms = default_delay_ms.max(0.0);
        Self {
            action_kind,
            delay_ms: default_delay_ms,
            sample_count: 0,
            samples: VecDeque::new(),
            default_delay_ms,
        }
    }

    /// 저장된 상태로부터 복원. `[0, max_sample_ms]` 밖이거나 유한하지 않은 샘플은 버리고,
    /// 용량을 넘으면 최신 샘플만 남긴다. 중앙값은 저장값이 아니라 샘플로 다시 계산한다.
    pub fn restore(
        action_kind: ActionKind,
        default_delay_ms: f64,
        stored: &StoredEstimate,
        capacity: usize,
        max_sample_ms: f64,
    ) -> Self {
        let mut estimate = Self::new(action_kind, default_delay_ms);
        let valid: Vec<f64> = stored
            .samples
            .iter()
            .copied()
            .filter(|s| is_valid_sample(*s, max_sample_ms))
            .collect();
        let skip = valid.len().saturating_sub(capacity);
        estimate.samples = valid.into_iter().skip(skip).collect();
        estimate.sample_count = stored.sample_count.max(estimate.samples.len() as u64);
        estimate.recompute();
        estimate
    }

    /// 샘플 추가 (용량 초과 시 가장 오래된 샘플 제거) 후 즉시 중앙값 재계산
    pub fn push(&mut self, sample_ms: f64, capacity: usize) {
        self.samples.push_back(sample_ms.max(0.0));
        while self.samples.len() > capacity.max(1) {
            self.samples.pop_front();
        }
        self.sample_count += 1;
        self.recompute();
    }

    /// 샘플 전체 삭제 (기본값으로 복귀)
    pub fn clear(&mut self) {
        self.samples.clear();
        self.sample_count = 0;
        self.recompute();
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// 현재 창에 남아 있는 샘플 수
    pub fn window_len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// 영속화용 표현
    pub fn to_stored(&self) -> StoredEstimate {
        StoredEstimate {
            delay_ms: self.delay_ms,
            samples: self.samples.iter().copied().collect(),
            sample_count: self.sample_count,
        }
    }

    fn recompute(&mut self) {
        let values: Vec<f64> = self.samples.iter().copied().collect();
        self.delay_ms = median(&values)
            .map(|m| m.max(0.0))
            .unwrap_or(self.default_delay_ms);
    }
}

/// 저장소에 기록되는 추정치 (`{ delay_ms, samples }`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEstimate {
    pub delay_ms: f64,
    #[serde(default)]
    pub samples: Vec<f64>,
    #[serde(default)]
    pub sample_count: u64,
}

/// 액션 종류 → 저장 추정치 전체 스냅샷
pub type CalibrationSnapshot = BTreeMap<ActionKind, StoredEstimate>;

/// 유한하고 `[0, max_sample_ms]` 안에 있는 샘플만 유효
pub fn is_valid_sample(sample_ms: f64, max_sample_ms: f64) -> bool {
    sample_ms.is_finite() && (0.0..=max_sample_ms).contains(&sample_ms)
}

/// 중앙값 (짝수 개면 가운데 두 값의 평균). 비어 있으면 None.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
