//! keyhook library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the `keyhook-monitor` binary share the same module tree.
//!
//! # Architecture
//!
//! ```text
//! HookManager ──install──► HookPlatform::register ──► SetWindowsHookExW
//!      │                                                   │
//!      └─ Rc<KeyHookProcessor> ◄── thread-local ◄──────────┘ hook procedure
//! ```
//!
//! The OS hook procedure receives no user pointer, so the installed manager
//! parks a reference to its processor in a thread-local slot for as long as the
//! registration lives. [`manager::dispatch`] is the single entry point through
//! which both the Windows procedure and the test mock feed events.

pub mod config;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod platform;

pub use error::{HookError, HookOperation};
pub use keyhook_core::{HookDecision, KeyDirection, KeyEventRecord, Keys, ModifierState, ObserverId};
pub use manager::HookManager;
pub use platform::{HookHandle, HookPlatform};
