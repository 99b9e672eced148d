//! 전이 이벤트 / 예약 액션 모델.

use std::time::Instant;

use super::symbol::{ActionKind, Symbol};

/// 확정된 심볼 변화 (previous → new)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    /// 이전 수용 심볼 (최초 전이면 None)
    pub previous: Option<Symbol>,
    /// 새로 수용된 심볼
    pub new: Symbol,
    /// 전이를 만든 프레임의 캡처 시각
    pub timestamp: Instant,
}

impl TransitionEvent {
    pub fn new(previous: Option<Symbol>, new: Symbol, timestamp: Instant) -> Self {
        Self {
            previous,
            new,
            timestamp,
        }
    }
}

/// 발사 대기 중인 액션. 최대 한 번 소비되며 같은 종류의 새 전이가 오면 교체된다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    pub target_time: Instant,
    pub action_kind: ActionKind,
    /// 원인 전이의 시각 (로그용)
    pub event_timestamp: Instant,
}
