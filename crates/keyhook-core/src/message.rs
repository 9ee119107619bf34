//! Keyboard message codes delivered alongside each low-level hook event.
//!
//! The OS passes the message code in `wParam`. Only the four key messages below
//! drive the hook; any other value is forwarded untouched.

use crate::event::KeyDirection;

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;

/// A recognised keyboard message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMessage {
    KeyDown,
    KeyUp,
    /// Key pressed while Alt is held, or F10.
    SysKeyDown,
    SysKeyUp,
}

impl KeyMessage {
    /// Decodes a raw message code; `None` for anything that is not a key message.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            WM_KEYDOWN => Some(KeyMessage::KeyDown),
            WM_KEYUP => Some(KeyMessage::KeyUp),
            WM_SYSKEYDOWN => Some(KeyMessage::SysKeyDown),
            WM_SYSKEYUP => Some(KeyMessage::SysKeyUp),
            _ => None,
        }
    }

    /// Which transition this message reports.
    pub fn direction(self) -> KeyDirection {
        match self {
            KeyMessage::KeyDown | KeyMessage::SysKeyDown => KeyDirection::Down,
            KeyMessage::KeyUp | KeyMessage::SysKeyUp => KeyDirection::Up,
        }
    }
}
