//! Modifier families and the set of currently held modifiers.
//!
//! Windows reports each physical modifier with its own virtual key: left and
//! right variants (`VK_LSHIFT`, `VK_RSHIFT`, ...) plus a generic one
//! (`VK_SHIFT`). All three collapse onto one logical family here.

use crate::keys::Keys;

/// One of the three tracked modifier families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierFamily {
    Shift,
    Control,
    Alt,
}

impl ModifierFamily {
    /// Classifies a virtual key into its modifier family.
    ///
    /// Modifier flags already carried by `key` are ignored; only the key code
    /// matters. Returns `None` for every non-modifier key.
    pub fn from_key(key: Keys) -> Option<Self> {
        match key.base() {
            Keys::SHIFT_KEY | Keys::LSHIFT_KEY | Keys::RSHIFT_KEY => Some(ModifierFamily::Shift),
            Keys::CONTROL_KEY | Keys::LCONTROL_KEY | Keys::RCONTROL_KEY => {
                Some(ModifierFamily::Control)
            }
            Keys::MENU | Keys::LMENU | Keys::RMENU => Some(ModifierFamily::Alt),
            _ => None,
        }
    }

    /// The flag this family contributes to a combined [`Keys`] value.
    pub const fn flag(self) -> Keys {
        match self {
            ModifierFamily::Shift => Keys::SHIFT,
            ModifierFamily::Control => Keys::CONTROL,
            ModifierFamily::Alt => Keys::ALT,
        }
    }
}

/// The modifier families currently held down, as observed by the hook.
///
/// Inserting an already-held family is a no-op, as is removing one that is not
/// held. The state only reflects transitions the hook has seen; it is not
/// reconciled against the physical keyboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    flags: Keys,
}

impl ModifierState {
    /// An empty state: nothing held.
    pub const fn new() -> Self {
        Self { flags: Keys::NONE }
    }

    /// Marks `family` as held.
    pub fn insert(&mut self, family: ModifierFamily) {
        self.flags |= family.flag();
    }

    /// Marks `family` as released.
    pub fn remove(&mut self, family: ModifierFamily) {
        self.flags = self.flags.without(family.flag());
    }

    /// Returns `true` if `family` is held.
    pub fn contains(&self, family: ModifierFamily) -> bool {
        self.flags.contains(family.flag())
    }

    /// Returns `true` if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.flags.is_none()
    }

    /// Releases every family.
    pub fn clear(&mut self) {
        self.flags = Keys::NONE;
    }

    /// The held families as [`Keys`] modifier flags.
    pub const fn to_keys(&self) -> Keys {
        self.flags
    }

    /// Combines `key` with the held modifier flags.
    pub fn apply(&self, key: Keys) -> Keys {
        key | self.flags
    }
}
