//! 제어 채널.
//!
//! 콘솔 스레드와 시그널 태스크가 메시지를 넣고, 폴링 루프가 매 반복 시작 시 한 번에 비운다.
//! 고정 용량 lock-free 큐라서 루프 쪽은 절대 블로킹되지 않는다.

use crossbeam::queue::ArrayQueue;
use flicker_core::models::control::ControlMessage;
use std::sync::Arc;
use tracing::warn;

/// 기본 큐 용량
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct ControlChannel {
    queue: Arc<ArrayQueue<ControlMessage>>,
}

impl ControlChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// 메시지 전송. 큐가 가득 차면 버리고 false.
    ///
    /// `Quit`은 가장 오래된 메시지를 밀어내고라도 반드시 들어간다.
    pub fn send(&self, message: ControlMessage) -> bool {
        if message == ControlMessage::Quit {
            self.queue.force_push(message);
            return true;
        }
        match self.queue.push(message) {
            Ok(()) => true,
            Err(dropped) => {
                warn!(?dropped, "제어 큐 가득 참, 메시지 버림");
                false
            }
        }
    }

    /// 대기 중인 메시지 전부 (도착 순)
    pub fn drain(&self) -> Vec<ControlMessage> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
