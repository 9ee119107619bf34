//! Error types for hook lifecycle operations.

use std::fmt;

use keyhook_core::ObserversBusy;
use thiserror::Error;

/// Which lifecycle call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOperation {
    Install,
    Uninstall,
}

impl fmt::Display for HookOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOperation::Install => f.write_str("install"),
            HookOperation::Uninstall => f.write_str("uninstall"),
        }
    }
}

/// Error type for [`HookManager`](crate::HookManager) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The OS refused to register or deregister the hook.
    #[error("failed to {operation} keyboard hook (OS error {code})")]
    PlatformRegistration {
        operation: HookOperation,
        /// The OS last-error code.
        code: u32,
    },

    /// Another manager already has a hook installed on this thread.
    #[error("a keyboard hook is already installed on this thread by another manager")]
    AlreadyActive,

    /// An observer list was changed from inside one of its own observers.
    #[error(transparent)]
    ObserversBusy(#[from] ObserversBusy),
}

impl HookError {
    /// The OS error code, for platform failures.
    pub fn os_code(&self) -> Option<u32> {
        match self {
            HookError::PlatformRegistration { code, .. } => Some(*code),
            HookError::AlreadyActive | HookError::ObserversBusy(_) => None,
        }
    }
}
