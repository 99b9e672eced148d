//! 제어 메시지.
//!
//! 제어 표면(콘솔, 시그널)이 큐에 넣고 폴링 루프가 매 반복 시작 시 꺼내 처리한다.

use super::symbol::ActionKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// 폴링 일시정지 (트래커/보정 상태 유지)
    Pause,
    /// 폴링 재개
    Resume,
    /// "지금이 이상적인 순간" 표시: None이면 가장 최근 검출된 종류
    MarkIdeal(Option<ActionKind>),
    /// 보정 샘플 초기화 (무장 해제): None이면 전체
    Reset(Option<ActionKind>),
    /// 최소 쿨다운 조정 (밀리초, 음수 허용)
    AdjustCooldown(i64),
    /// 루프 종료
    Quit,
}
