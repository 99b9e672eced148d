//! 라이프사이클 관리.
//!
//! OS 시그널(SIGINT, SIGTERM)을 제어 채널의 `Quit`으로 바꾼다.
//! 루프는 다음 반복에서 이를 읽고 보정 상태를 저장한 뒤 종료한다.

use flicker_core::models::control::ControlMessage;
use tracing::{info, warn};

use crate::control::ControlChannel;

/// 라이프사이클 관리자
pub struct LifecycleManager {
    control: ControlChannel,
}

impl LifecycleManager {
    pub fn new(control: ControlChannel) -> Self {
        Self { control }
    }

    /// 종료 요청
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        self.control.send(ControlMessage::Quit);
    }

    /// OS 시그널 대기 후 종료 요청. 핸들러 등록에 실패하면 경고만 남긴다.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let (mut sigint, mut sigterm) =
                match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                    (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("시그널 핸들러 등록 실패: {e}");
                        return;
                    }
                };

            tokio::select! {
                _ = sigint.recv() => {
                    info!("SIGINT 수신");
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM 수신");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl+C 핸들러 등록 실패: {e}");
                return;
            }
            info!("Ctrl+C 수신");
        }

        self.shutdown();
    }
}
