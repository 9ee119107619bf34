//! Event records: the raw OS keyboard record and the record handed to observers.

use crate::keys::Keys;

/// Direction of a key transition, taken from the OS message code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    Down,
    Up,
}

/// One dispatched keystroke, as seen by observers.
///
/// `key` already carries the modifier flags held when the event arrived. An
/// observer sets `handled` to ask that the keystroke be swallowed instead of
/// continuing to its normal destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventRecord {
    /// Virtual key code combined with the held modifier flags.
    pub key: Keys,
    /// Whether this is a press or a release.
    pub direction: KeyDirection,
    /// Set by an observer to suppress the keystroke.
    pub handled: bool,
}

impl KeyEventRecord {
    /// Creates an unhandled record.
    pub fn new(key: Keys, direction: KeyDirection) -> Self {
        Self {
            key,
            direction,
            handled: false,
        }
    }
}

/// A low-level keyboard record as delivered by the OS (`KBDLLHOOKSTRUCT`).
///
/// The OS owns the memory behind the original record; hook procedures copy the
/// fields into this value and never keep a pointer past the callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RawKeyEvent {
    /// Windows virtual key code.
    pub vk_code: u32,
    /// Hardware scan code.
    pub scan_code: u32,
    /// `LLKHF_*` flags.
    pub flags: u32,
    /// Milliseconds since system start.
    pub time: u32,
    /// Extra information associated with the message.
    pub extra_info: usize,
}

impl RawKeyEvent {
    /// Builds a record carrying only a virtual key code.
    pub fn from_vk(vk_code: u32) -> Self {
        Self {
            vk_code,
            ..Self::default()
        }
    }

    /// The virtual key, without modifier flags.
    pub fn key(&self) -> Keys {
        Keys::from_vk(self.vk_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unhandled() {
        let record = KeyEventRecord::new(Keys::A | Keys::SHIFT, KeyDirection::Down);
        assert!(!record.handled);
        assert_eq!(record.key, Keys::A | Keys::SHIFT);
    }

    #[test]
    fn test_raw_event_key_ignores_other_fields() {
        let raw = RawKeyEvent {
            vk_code: 0xA3,
            scan_code: 0x1D,
            flags: 0x11,
            time: 1234,
            extra_info: 0,
        };

        assert_eq!(raw.key(), Keys::RCONTROL_KEY);
    }

    #[test]
    fn test_raw_event_layout_matches_kbdllhookstruct() {
        // Four DWORDs followed by a ULONG_PTR.
        let expected = 4 * std::mem::size_of::<u32>() + std::mem::size_of::<usize>();
        assert_eq!(std::mem::size_of::<RawKeyEvent>(), expected);
    }
}
