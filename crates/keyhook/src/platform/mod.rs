//! OS-facing side of the keyboard hook.
//!
//! On Windows, [`windows::WindowsHookPlatform`] registers a `WH_KEYBOARD_LL`
//! procedure whose body forwards every event to [`crate::manager::dispatch`].
//!
//! # Testability
//!
//! The [`HookPlatform`] trait lets tests replace the OS with
//! [`mock::MockHookPlatform`], which feeds synthetic events through the same
//! dispatch path.

use std::fmt;
use std::num::NonZeroIsize;

use crate::error::HookError;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Opaque, non-null OS hook handle (`HHOOK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(NonZeroIsize);

impl HookHandle {
    /// Wraps a raw handle value; `None` for the null handle.
    pub fn new(raw: isize) -> Option<Self> {
        NonZeroIsize::new(raw).map(HookHandle)
    }

    /// The raw handle value.
    pub fn get(self) -> isize {
        self.0.get()
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// Registration and deregistration of the low-level keyboard hook.
///
/// Implementations install a procedure that calls
/// [`crate::manager::dispatch`] for every event, on the thread that called
/// `register`.
pub trait HookPlatform {
    /// Registers the hook procedure system-wide.
    fn register(&self) -> Result<HookHandle, HookError>;

    /// Removes a registration made by [`register`](Self::register).
    fn unregister(&self, handle: HookHandle) -> Result<(), HookError>;
}
