//! 콘솔 제어 표면.
//!
//! 표준 입력을 한 줄씩 읽어 제어 메시지로 바꾼다. 폴링 루프와는 제어 채널로만 통신한다.

use flicker_core::error::CoreError;
use flicker_core::models::control::ControlMessage;
use flicker_core::models::symbol::ActionKind;
use std::io::BufRead;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::ControlChannel;

/// 콘솔 명령
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Control(ControlMessage),
    Help,
}

pub const HELP: &str = "\
명령:
  p, pause          일시정지
  r, resume         재개
  m, mark [kind]    지금이 이상적인 순간 (kind 생략 시 최근 검출 종류)
  reset [kind]      보정 샘플 초기화 (kind 생략 시 전체)
  +N / -N           쿨다운 N밀리초 증감
  q, quit           종료
  h, help           이 도움말";

/// 한 줄 해석. 빈 줄은 `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CoreError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next().map(ActionKind::new);
    if parts.next().is_some() {
        return Err(CoreError::validation("console", format!("인자가 너무 많음: {line}")));
    }

    let message = match head.to_lowercase().as_str() {
        "p" | "pause" => ControlMessage::Pause,
        "r" | "resume" => ControlMessage::Resume,
        "m" | "mark" => ControlMessage::MarkIdeal(arg),
        "reset" => ControlMessage::Reset(arg),
        "q" | "quit" | "exit" => ControlMessage::Quit,
        "h" | "help" | "?" => return Ok(Some(ConsoleCommand::Help)),
        other if other.starts_with('+') || other.starts_with('-') => {
            let delta: i64 = other.parse().map_err(|_| {
                CoreError::validation("console", format!("쿨다운 증감값 오류: {other}"))
            })?;
            ControlMessage::AdjustCooldown(delta)
        }
        other => {
            return Err(CoreError::validation(
                "console",
                format!("알 수 없는 명령: {other}"),
            ))
        }
    };
    Ok(Some(ConsoleCommand::Control(message)))
}

/// 리더에서 명령을 읽어 채널로 전달. EOF 또는 `Quit`에서 반환.
pub fn pump_commands<R: BufRead>(reader: R, control: &ControlChannel) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("콘솔 입력 읽기 실패: {e}");
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(ConsoleCommand::Help)) => println!("{HELP}"),
            Ok(Some(ConsoleCommand::Control(message))) => {
                let quit = message == ControlMessage::Quit;
                debug!(?message, "콘솔 명령");
                control.send(message);
                if quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e} (h: 도움말)"),
        }
    }
    debug!("콘솔 입력 종료");
}

/// 표준 입력 리더 스레드 시작
pub fn spawn_console(control: ControlChannel) -> std::io::Result<JoinHandle<()>> {
    info!("콘솔 제어 활성화 (h: 도움말)");
    std::thread::Builder::new()
        .name("flicker-console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            pump_commands(stdin.lock(), &control);
        })
}
