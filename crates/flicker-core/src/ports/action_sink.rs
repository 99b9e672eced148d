//! 액션 싱크 포트.
//!
//! 구현: `flicker-automation::action_sink::InputActionSink`

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::symbol::ActionKind;

/// 외부 액션 발사 (마우스/키보드 디스패치)
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// 액션 실행. 실패 시 스케줄러는 로그만 남기고 대기 액션을 버린다.
    async fn fire(&self, action_kind: &ActionKind) -> Result<(), CoreError>;

    /// 싱크 이름 (로그용)
    fn name(&self) -> &str;
}
