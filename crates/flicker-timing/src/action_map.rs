//! 전이 → 액션 종류 매핑.
//!
//! 어떤 전이가 어떤 액션을 유발하는지는 게임 시나리오마다 달라 설정 데이터로 둔다.
//! 규칙은 순서대로 평가하며 먼저 일치한 규칙이 이긴다.

use flicker_core::config::TransitionRule;
use flicker_core::models::symbol::ActionKind;
use flicker_core::models::transition::TransitionEvent;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct ActionMap {
    rules: Vec<TransitionRule>,
}

impl ActionMap {
    pub fn new(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    /// 전이에 해당하는 액션 종류 (`from: None` 규칙은 이전 상태와 무관하게 일치)
    pub fn resolve(&self, event: &TransitionEvent) -> Option<&ActionKind> {
        self.rules
            .iter()
            .find(|rule| {
                rule.to == event.new
                    && rule
                        .from
                        .as_ref()
                        .map_or(true, |from| event.previous.as_ref() == Some(from))
            })
            .map(|rule| &rule.action)
    }

    /// 규칙에 등장하는 모든 액션 종류
    pub fn kinds(&self) -> BTreeSet<&ActionKind> {
        self.rules.iter().map(|r| &r.action).collect()
    }
}
