//! 입력 드라이버 구현.
//!
//! `NoOpInputDriver` (드라이런/테스트)와 `EnigoInputDriver` (실제 입력, `enigo` feature)를 제공한다.
//! 키 이름은 [`KeySpec`]으로 먼저 해석되므로 잘못된 바인딩은 발사 시점이 아니라 시작 시점에 드러난다.

use async_trait::async_trait;
use tracing::debug;

use flicker_core::error::CoreError;
use flicker_core::ports::input_driver::{InputDriver, MouseButton};

// ============================================================
// 키 이름 해석
// ============================================================

/// 이름 있는 특수 키
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Return,
    Tab,
    Escape,
    Backspace,
    Delete,
    Space,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Control,
    Shift,
    Alt,
    Meta,
    CapsLock,
    /// F1..F12
    Function(u8),
}

/// 바인딩 키 명세
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    Named(NamedKey),
    /// 단일 문자 키
    Char(char),
}

impl KeySpec {
    /// 키 이름 해석 (대소문자 무시). 알 수 없는 이름은 에러.
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let lower = key.trim().to_lowercase();
        let named = match lower.as_str() {
            "enter" | "return" => NamedKey::Return,
            "tab" => NamedKey::Tab,
            "escape" | "esc" => NamedKey::Escape,
            "backspace" => NamedKey::Backspace,
            "delete" | "del" => NamedKey::Delete,
            "space" => NamedKey::Space,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" => NamedKey::PageUp,
            "pagedown" => NamedKey::PageDown,
            "up" | "uparrow" => NamedKey::Up,
            "down" | "downarrow" => NamedKey::Down,
            "left" | "leftarrow" => NamedKey::Left,
            "right" | "rightarrow" => NamedKey::Right,
            "ctrl" | "control" => NamedKey::Control,
            "shift" => NamedKey::Shift,
            "alt" | "option" => NamedKey::Alt,
            "meta" | "command" | "cmd" | "super" | "win" => NamedKey::Meta,
            "capslock" => NamedKey::CapsLock,
            other => {
                if let Some(n) = other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if (1..=12).contains(&n) {
                        return Ok(Self::Named(NamedKey::Function(n)));
                    }
                }
                let mut chars = key.trim().chars();
                return match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Self::Char(ch.to_ascii_lowercase())),
                    _ => Err(CoreError::validation(
                        "actions.key",
                        format!("알 수 없는 키 이름: {key}"),
                    )),
                };
            }
        };
        Ok(Self::Named(named))
    }
}

// ============================================================
// NoOpInputDriver: 드라이런/테스트용
// ============================================================

/// No-Op 입력 드라이버: 입력을 로그만 남기고 실행하지 않음
pub struct NoOpInputDriver;

#[async_trait]
impl InputDriver for NoOpInputDriver {
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError> {
        debug!(x, y, "[dry-run] 마우스 이동");
        Ok(())
    }

    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError> {
        debug!(?button, x, y, "[dry-run] 마우스 클릭");
        Ok(())
    }

    async fn key_press(&self, key: &str) -> Result<(), CoreError> {
        debug!(key, "[dry-run] 키 누름");
        Ok(())
    }

    async fn key_release(&self, key: &str) -> Result<(), CoreError> {
        debug!(key, "[dry-run] 키 놓음");
        Ok(())
    }

    fn platform(&self) -> &str {
        "noop"
    }
}

// ============================================================
// EnigoInputDriver: 실제 마우스/키보드 입력
// ============================================================

/// 실제 마우스/키보드 입력 드라이버 (enigo 기반)
///
/// macOS: Accessibility 권한 필요
/// Windows: 게임 창보다 높은 권한이면 입력이 무시될 수 있음
/// Linux: X11 또는 Wayland + uinput 권한 필요
#[cfg(feature = "enigo")]
pub struct EnigoInputDriver {
    /// enigo 인스턴스 (Send지만 !Sync → tokio::sync::Mutex 사용)
    enigo: tokio::sync::Mutex<enigo::Enigo>,
}

#[cfg(feature = "enigo")]
impl EnigoInputDriver {
    pub fn new() -> Result<Self, CoreError> {
        let settings = enigo::Settings::default();
        let enigo = enigo::Enigo::new(&settings)
            .map_err(|e| CoreError::Input(format!("입력 드라이버 초기화 실패: {e}")))?;
        Ok(Self {
            enigo: tokio::sync::Mutex::new(enigo),
        })
    }

    fn to_enigo_key(spec: KeySpec) -> enigo::Key {
        match spec {
            KeySpec::Char(ch) => enigo::Key::Unicode(ch),
            KeySpec::Named(named) => match named {
                NamedKey::Return => enigo::Key::Return,
                NamedKey::Tab => enigo::Key::Tab,
                NamedKey::Escape => enigo::Key::Escape,
                NamedKey::Backspace => enigo::Key::Backspace,
                NamedKey::Delete => enigo::Key::Delete,
                NamedKey::Space => enigo::Key::Space,
                NamedKey::Home => enigo::Key::Home,
                NamedKey::End => enigo::Key::End,
                NamedKey::PageUp => enigo::Key::PageUp,
                NamedKey::PageDown => enigo::Key::PageDown,
                NamedKey::Up => enigo::Key::UpArrow,
                NamedKey::Down => enigo::Key::DownArrow,
                NamedKey::Left => enigo::Key::LeftArrow,
                NamedKey::Right => enigo::Key::RightArrow,
                NamedKey::Control => enigo::Key::Control,
                NamedKey::Shift => enigo::Key::Shift,
                NamedKey::Alt => enigo::Key::Alt,
                NamedKey::Meta => enigo::Key::Meta,
                NamedKey::CapsLock => enigo::Key::CapsLock,
                NamedKey::Function(n) => match n {
                    1 => enigo::Key::F1,
                    2 => enigo::Key::F2,
                    3 => enigo::Key::F3,
                    4 => enigo::Key::F4,
                    5 => enigo::Key::F5,
                    6 => enigo::Key::F6,
                    7 => enigo::Key::F7,
                    8 => enigo::Key::F8,
                    9 => enigo::Key::F9,
                    10 => enigo::Key::F10,
                    11 => enigo::Key::F11,
                    _ => enigo::Key::F12,
                },
            },
        }
    }

    async fn send_key(&self, key: &str, direction: enigo::Direction) -> Result<(), CoreError> {
        use enigo::Keyboard;
        let spec = KeySpec::parse(key)?;
        let mut enigo = self.enigo.lock().await;
        enigo
            .key(Self::to_enigo_key(spec), direction)
            .map_err(|e| CoreError::Input(format!("키 입력 실패 ({key}): {e}")))
    }
}

#[cfg(feature = "enigo")]
#[async_trait]
impl InputDriver for EnigoInputDriver {
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(x, y, "[Enigo] 마우스 이동");
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Input(format!("마우스 이동 실패: {e}")))
    }

    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(?button, x, y, "[Enigo] 마우스 클릭");
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Input(format!("마우스 이동 실패: {e}")))?;
        let btn = match button {
            MouseButton::Left => enigo::Button::Left,
            MouseButton::Right => enigo::Button::Right,
            MouseButton::Middle => enigo::Button::Middle,
        };
        enigo
            .button(btn, enigo::Direction::Click)
            .map_err(|e| CoreError::Input(format!("마우스 클릭 실패: {e}")))
    }

    async fn key_press(&self, key: &str) -> Result<(), CoreError> {
        debug!(key, "[Enigo] 키 누름");
        self.send_key(key, enigo::Direction::Press).await
    }

    async fn key_release(&self, key: &str) -> Result<(), CoreError> {
        debug!(key, "[Enigo] 키 놓음");
        self.send_key(key, enigo::Direction::Release).await
    }

    fn platform(&self) -> &str {
        #[cfg(target_os = "macos")]
        {
            "macos"
        }
        #[cfg(target_os = "windows")]
        {
            "windows"
        }
        #[cfg(target_os = "linux")]
        {
            "linux"
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            "unknown"
        }
    }
}

/// 입력 드라이버 생성
///
/// `dry_run`이거나 `enigo` feature가 꺼져 있으면 NoOp, 아니면 enigo (초기화 실패 시 NoOp 폴백).
pub fn create_input_driver(dry_run: bool) -> Box<dyn InputDriver> {
    if dry_run {
        tracing::info!("드라이런: 입력을 전송하지 않음");
        return Box::new(NoOpInputDriver);
    }
    #[cfg(feature = "enigo")]
    {
        match EnigoInputDriver::new() {
            Ok(driver) => {
                tracing::info!("실제 입력 드라이버 (enigo) 초기화 완료");
                return Box::new(driver);
            }
            Err(e) => {
                tracing::warn!("enigo 초기화 실패, NoOp 폴백: {e}");
            }
        }
    }
    #[cfg(not(feature = "enigo"))]
    tracing::warn!("enigo feature 비활성화: NoOp 입력 드라이버 사용");
    Box::new(NoOpInputDriver)
}

// ============================================================
// 테스트
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_driver_all_methods_ok() {
        let driver = NoOpInputDriver;
        assert!(driver.mouse_move(100, 200).await.is_ok());
        assert!(driver.mouse_click(MouseButton::Right, 100, 200).await.is_ok());
        assert!(driver.key_press("space").await.is_ok());
        assert!(driver.key_release("space").await.is_ok());
        assert_eq!(driver.platform(), "noop");
    }

    #[test]
    fn key_spec_named_and_char() {
        assert_eq!(KeySpec::parse("Enter").unwrap(), KeySpec::Named(NamedKey::Return));
        assert_eq!(KeySpec::parse("cmd").unwrap(), KeySpec::Named(NamedKey::Meta));
        assert_eq!(KeySpec::parse("F12").unwrap(), KeySpec::Named(NamedKey::Function(12)));
        assert_eq!(KeySpec::parse("Q").unwrap(), KeySpec::Char('q'));
        assert_eq!(KeySpec::parse("1").unwrap(), KeySpec::Char('1'));
    }

    #[test]
    fn key_spec_rejects_unknown() {
        assert!(KeySpec::parse("f13").is_err());
        assert!(KeySpec::parse("hyperdrive").is_err());
        assert!(KeySpec::parse("").is_err());
    }

    #[test]
    fn dry_run_factory_is_noop() {
        assert_eq!(create_input_driver(true).platform(), "noop");
    }

    #[cfg(feature = "enigo")]
    #[test]
    fn enigo_key_mapping() {
        assert!(matches!(
            EnigoInputDriver::to_enigo_key(KeySpec::parse("esc").unwrap()),
            enigo::Key::Escape
        ));
        assert!(matches!(
            EnigoInputDriver::to_enigo_key(KeySpec::parse("f1").unwrap()),
            enigo::Key::F1
        ));
        assert!(matches!(
            EnigoInputDriver::to_enigo_key(KeySpec::Char('x')),
            enigo::Key::Unicode('x')
        ));
    }
}
