//! 입력 기반 액션 싱크.
//!
//! 액션 종류를 설정의 키/클릭 바인딩으로 바꿔 입력 드라이버에 전달한다.

use async_trait::async_trait;
use flicker_core::config::ActionBinding;
use flicker_core::error::CoreError;
use flicker_core::models::symbol::ActionKind;
use flicker_core::ports::action_sink::ActionSink;
use flicker_core::ports::input_driver::InputDriver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::input_driver::KeySpec;

pub struct InputActionSink {
    driver: Arc<dyn InputDriver>,
    bindings: BTreeMap<ActionKind, ActionBinding>,
}

impl InputActionSink {
    /// 바인딩 검증 후 생성 (알 수 없는 키 이름은 에러)
    pub fn new(
        driver: Arc<dyn InputDriver>,
        bindings: BTreeMap<ActionKind, ActionBinding>,
    ) -> Result<Self, CoreError> {
        for (kind, binding) in &bindings {
            if let ActionBinding::Key { key } = binding {
                KeySpec::parse(key).map_err(|e| {
                    CoreError::validation(format!("actions.{kind}"), e.to_string())
                })?;
            }
        }
        Ok(Self { driver, bindings })
    }

    /// 주어진 종류 중 바인딩이 없는 것 (발사 시 실패로 처리될 종류)
    pub fn unbound<'a>(
        &self,
        kinds: impl IntoIterator<Item = &'a ActionKind>,
    ) -> Vec<&'a ActionKind> {
        kinds
            .into_iter()
            .filter(|kind| !self.bindings.contains_key(*kind))
            .collect()
    }
}

#[async_trait]
impl ActionSink for InputActionSink {
    async fn fire(&self, action_kind: &ActionKind) -> Result<(), CoreError> {
        let binding = self
            .bindings
            .get(action_kind)
            .ok_or_else(|| CoreError::NotFound {
                resource_type: "ActionBinding".to_string(),
                id: action_kind.to_string(),
            })?;

        match binding {
            ActionBinding::Key { key } => {
                debug!(kind = %action_kind, key, "키 탭");
                self.driver.key_press(key).await?;
                self.driver.key_release(key).await
            }
            ActionBinding::Click { button, x, y } => {
                debug!(kind = %action_kind, ?button, x, y, "클릭");
                self.driver.mouse_click(*button, *x, *y).await
            }
        }
    }

    fn name(&self) -> &str {
        self.driver.platform()
    }
}
