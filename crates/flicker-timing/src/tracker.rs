//! 전이 트래커.
//!
//! 상태는 "마지막으로 수용한 심볼 또는 없음" 하나다.
//! 같은 심볼 반복, 임계값 미달, 미검출은 모두 무시되어 깜빡임을 흡수하고,
//! 순환 순서가 설정되면 기대 후속 심볼 외의 변화는 잡음으로 버린다.

use flicker_core::config::TrackerConfig;
use flicker_core::error::CoreError;
use flicker_core::models::classification::{Classification, ClassificationResult};
use flicker_core::models::symbol::Symbol;
use flicker_core::models::transition::TransitionEvent;
use std::collections::HashMap;
use tracing::{debug, info};

/// 순환 시퀀스 (예: 1 → 2 → 3 → 4 → 1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceCycle {
    order: Vec<Symbol>,
    successors: HashMap<Symbol, Symbol>,
}

impl SequenceCycle {
    /// 순서 목록으로 생성. 비어 있거나 중복이 있으면 에러.
    pub fn new(order: Vec<Symbol>) -> Result<Self, CoreError> {
        if order.is_empty() {
            return Err(CoreError::validation("tracker.cycle", "주기가 비어 있음"));
        }
        let mut successors = HashMap::with_capacity(order.len());
        for (i, symbol) in order.iter().enumerate() {
            let next = order[(i + 1) % order.len()].clone();
            if successors.insert(symbol.clone(), next).is_some() {
                return Err(CoreError::validation(
                    "tracker.cycle",
                    format!("중복 심볼: {symbol}"),
                ));
            }
        }
        Ok(Self { order, successors })
    }

    /// 기대 후속 심볼
    pub fn successor(&self, symbol: &Symbol) -> Option<&Symbol> {
        self.successors.get(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.successors.contains_key(symbol)
    }

    pub fn order(&self) -> &[Symbol] {
        &self.order
    }
}

/// 트래커 모드
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerMode {
    /// 어떤 변화든 전이로 인정
    Unrestricted,
    /// 기대 후속 심볼로의 변화만 인정
    Strict(SequenceCycle),
}

/// 관찰 하나의 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutcome {
    /// 미검출 또는 임계값 미달
    NoSignal,
    /// 현재 상태와 같은 심볼
    Repeat,
    /// 순환 순서 위반 (상태 변경 없음)
    OutOfOrder {
        symbol: Symbol,
        expected: Option<Symbol>,
    },
    /// 최초 심볼 수용 (이벤트 미발행 설정)
    Seeded(Symbol),
    /// 확정 전이
    Transition(TransitionEvent),
}

impl TrackerOutcome {
    pub fn into_event(self) -> Option<TransitionEvent> {
        match self {
            Self::Transition(event) => Some(event),
            _ => None,
        }
    }
}

/// 전이 상태 머신
#[derive(Debug, Clone)]
pub struct TransitionTracker {
    mode: TrackerMode,
    accept_threshold: f32,
    emit_initial: bool,
    last_accepted: Option<Symbol>,
    expected_next: Option<Symbol>,
}

impl TransitionTracker {
    pub fn new(mode: TrackerMode, accept_threshold: f32, emit_initial: bool) -> Self {
        Self {
            mode,
            accept_threshold,
            emit_initial,
            last_accepted: None,
            expected_next: None,
        }
    }

    /// 설정에서 생성 (`cycle`이 있으면 엄격 모드)
    pub fn from_config(config: &TrackerConfig) -> Result<Self, CoreError> {
        let mode = match &config.cycle {
            Some(order) => TrackerMode::Strict(SequenceCycle::new(order.clone())?),
            None => TrackerMode::Unrestricted,
        };
        Ok(Self::new(mode, config.accept_threshold, config.emit_initial))
    }

    /// 분류 결과 하나를 반영
    pub fn observe(&mut self, result: &ClassificationResult) -> TrackerOutcome {
        let (symbol, score) = match &result.classification {
            Classification::Found { symbol, score } if *score >= self.accept_threshold => {
                (symbol, *score)
            }
            _ => return TrackerOutcome::NoSignal,
        };

        if self.last_accepted.as_ref() == Some(symbol) {
            return TrackerOutcome::Repeat;
        }

        if let TrackerMode::Strict(cycle) = &self.mode {
            let acceptable = if !cycle.contains(symbol) {
                false
            } else if self.last_accepted.is_none() {
                true
            } else {
                self.expected_next.as_ref() == Some(symbol)
            };
            if !acceptable {
                debug!(
                    symbol = %symbol,
                    expected = ?self.expected_next.as_ref().map(Symbol::as_str),
                    "순서 밖 심볼 무시"
                );
                return TrackerOutcome::OutOfOrder {
                    symbol: symbol.clone(),
                    expected: self.expected_next.clone(),
                };
            }
            self.expected_next = cycle.successor(symbol).cloned();
        }

        let previous = self.last_accepted.replace(symbol.clone());
        if previous.is_none() && !self.emit_initial {
            debug!(symbol = %symbol, "초기 심볼 수용 (이벤트 없음)");
            return TrackerOutcome::Seeded(symbol.clone());
        }

        info!(
            from = previous.as_ref().map(Symbol::as_str).unwrap_or("∅"),
            to = %symbol,
            score,
            "심볼 전이"
        );
        TrackerOutcome::Transition(TransitionEvent::new(
            previous,
            symbol.clone(),
            result.frame_timestamp,
        ))
    }

    /// 초기 상태(심볼 없음)로 복귀
    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.expected_next = None;
        debug!("트래커 리셋");
    }

    pub fn last_accepted(&self) -> Option<&Symbol> {
        self.last_accepted.as_ref()
    }

    pub fn expected_next(&self) -> Option<&Symbol> {
        self.expected_next.as_ref()
    }

    pub fn mode(&self) -> &TrackerMode {
        &self.mode
    }
}
