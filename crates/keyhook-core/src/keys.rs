//! Combined key values: a Windows virtual key code plus modifier flags.
//!
//! A [`Keys`] value packs the virtual key code into the low 16 bits and the
//! held modifier families into bits 16-18, the same layout .NET uses for its
//! `Keys` enumeration:
//!
//! ```text
//!  31        19 18  17  16 15               0
//! ┌───────────┬───┬───┬───┬──────────────────┐
//! │  unused   │Alt│Ctl│Sft│ virtual key code │
//! └───────────┴───┴───┴───┴──────────────────┘
//! ```
//!
//! So `Keys::A | Keys::CONTROL | Keys::ALT` is "Ctrl+Alt+A". Observers receive
//! exactly this combined value, which makes chord matching a single comparison.
//!
//! The textual form (`Display` / `FromStr`, also used by serde) is
//! `Ctrl+Shift+Alt+<key>`. Only a small table of key names is known; anything
//! else is written and parsed as a hex code such as `0xBA`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A virtual key code, optionally combined with modifier flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Keys(u32);

impl Keys {
    /// No key and no modifiers.
    pub const NONE: Keys = Keys(0);

    /// Mask selecting the virtual key code bits.
    pub const KEY_CODE: Keys = Keys(0x0000_FFFF);
    /// Mask selecting the modifier flag bits.
    pub const MODIFIERS: Keys = Keys(0x0007_0000);

    /// Shift modifier flag.
    pub const SHIFT: Keys = Keys(0x0001_0000);
    /// Control modifier flag.
    pub const CONTROL: Keys = Keys(0x0002_0000);
    /// Alt modifier flag.
    pub const ALT: Keys = Keys(0x0004_0000);

    // ── Modifier virtual keys (winuser.h) ─────────────────────────────────────
    pub const SHIFT_KEY: Keys = Keys(0x10);
    pub const CONTROL_KEY: Keys = Keys(0x11);
    /// `VK_MENU`, the generic Alt key.
    pub const MENU: Keys = Keys(0x12);
    pub const LSHIFT_KEY: Keys = Keys(0xA0);
    pub const RSHIFT_KEY: Keys = Keys(0xA1);
    pub const LCONTROL_KEY: Keys = Keys(0xA2);
    pub const RCONTROL_KEY: Keys = Keys(0xA3);
    pub const LMENU: Keys = Keys(0xA4);
    pub const RMENU: Keys = Keys(0xA5);

    // ── A few common keys ─────────────────────────────────────────────────────
    pub const ENTER: Keys = Keys(0x0D);
    pub const ESCAPE: Keys = Keys(0x1B);
    pub const SPACE: Keys = Keys(0x20);
    pub const DELETE: Keys = Keys(0x2E);
    pub const A: Keys = Keys(0x41);
    pub const F1: Keys = Keys(0x70);
    pub const F4: Keys = Keys(0x73);
    pub const F12: Keys = Keys(0x7B);

    /// Builds a key from a raw OS virtual key code.
    ///
    /// Bits above the key code range are discarded so a malformed OS value can
    /// never alias a modifier flag.
    pub const fn from_vk(vk_code: u32) -> Self {
        Keys(vk_code & Self::KEY_CODE.0)
    }

    /// Raw bit pattern, key code and modifiers together.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The virtual key code without modifiers.
    pub const fn code(self) -> u16 {
        (self.0 & Self::KEY_CODE.0) as u16
    }

    /// This key with all modifier flags stripped.
    pub const fn base(self) -> Keys {
        Keys(self.0 & Self::KEY_CODE.0)
    }

    /// Only the modifier flags of this key.
    pub const fn modifiers(self) -> Keys {
        Keys(self.0 & Self::MODIFIERS.0)
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Keys) -> bool {
        self.0 & other.0 == other.0
    }

    /// This value with every bit of `other` cleared.
    pub const fn without(self, other: Keys) -> Keys {
        Keys(self.0 & !other.0)
    }

    /// Returns `true` if this value carries no bits at all.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Keys {
    type Output = Keys;

    fn bitor(self, rhs: Keys) -> Keys {
        Keys(self.0 | rhs.0)
    }
}

impl BitOrAssign for Keys {
    fn bitor_assign(&mut self, rhs: Keys) {
        self.0 |= rhs.0;
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// Named keys outside the letter, digit and function-key ranges.
const NAMED_KEYS: &[(u16, &str)] = &[
    (0x08, "Backspace"),
    (0x09, "Tab"),
    (0x0D, "Enter"),
    (0x13, "Pause"),
    (0x14, "CapsLock"),
    (0x1B, "Escape"),
    (0x20, "Space"),
    (0x21, "PageUp"),
    (0x22, "PageDown"),
    (0x23, "End"),
    (0x24, "Home"),
    (0x25, "Left"),
    (0x26, "Up"),
    (0x27, "Right"),
    (0x28, "Down"),
    (0x2C, "PrintScreen"),
    (0x2D, "Insert"),
    (0x2E, "Delete"),
    (0x5B, "LWin"),
    (0x5C, "RWin"),
    (0x5D, "Apps"),
    (0x90, "NumLock"),
    (0x91, "ScrollLock"),
];

const VK_0: u16 = 0x30;
const VK_9: u16 = 0x39;
const VK_A: u16 = 0x41;
const VK_Z: u16 = 0x5A;
const VK_F1: u16 = 0x70;
const VK_F24: u16 = 0x87;

fn write_key_name(code: u16, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match code {
        VK_0..=VK_9 | VK_A..=VK_Z => write!(f, "{}", char::from(code as u8)),
        VK_F1..=VK_F24 => write!(f, "F{}", code - VK_F1 + 1),
        _ => match NAMED_KEYS.iter().find(|(vk, _)| *vk == code) {
            Some((_, name)) => f.write_str(name),
            None => write!(f, "0x{code:02X}"),
        },
    }
}

fn parse_key_name(token: &str) -> Option<u16> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c.to_ascii_uppercase() as u16);
        }
    }

    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }

    if let Some(number) = token.strip_prefix(['F', 'f']) {
        if let Ok(n) = number.parse::<u16>() {
            return (1..=24).contains(&n).then(|| VK_F1 + n - 1);
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(token))
        .map(|(vk, _)| *vk)
}

impl fmt::Display for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Keys::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        if self.contains(Keys::SHIFT) {
            f.write_str("Shift+")?;
        }
        if self.contains(Keys::ALT) {
            f.write_str("Alt+")?;
        }
        write_key_name(self.code(), f)
    }
}

/// Error returned when a key chord string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("key chord is empty")]
    Empty,
    #[error("unknown key name `{0}`")]
    UnknownKey(String),
    #[error("key chord `{0}` has modifiers but no key")]
    MissingKey(String),
    #[error("key chord `{0}` names more than one key")]
    MultipleKeys(String),
}

impl FromStr for Keys {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseKeyError::Empty);
        }

        let mut modifiers = Keys::NONE;
        let mut base: Option<u16> = None;

        for token in s.split('+').map(str::trim) {
            let modifier = match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Some(Keys::CONTROL),
                "shift" => Some(Keys::SHIFT),
                "alt" => Some(Keys::ALT),
                _ => None,
            };
            if let Some(modifier) = modifier {
                modifiers |= modifier;
                continue;
            }

            let code = parse_key_name(token)
                .ok_or_else(|| ParseKeyError::UnknownKey(token.to_string()))?;
            if base.replace(code).is_some() {
                return Err(ParseKeyError::MultipleKeys(s.to_string()));
            }
        }

        match base {
            Some(code) => Ok(Keys::from_vk(u32::from(code)) | modifiers),
            None => Err(ParseKeyError::MissingKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for Keys {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Keys> for String {
    fn from(keys: Keys) -> String {
        keys.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
