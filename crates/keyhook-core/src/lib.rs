//! # keyhook-core
//!
//! OS-independent building blocks for the keyhook low-level keyboard interceptor.
//!
//! This crate has zero dependencies on OS APIs. Everything the hook callback
//! decides (which family a key belongs to, which modifiers are held, which
//! observers to notify, whether to swallow the keystroke) lives here so it can be
//! exercised by ordinary unit tests on any host.
//!
//! # Architecture overview
//!
//! ```text
//! raw OS event ──► KeyHookProcessor::process
//!                    ├─ KeyMessage::from_code      (down / up / ignore)
//!                    ├─ ModifierFamily::from_key   (Shift / Control / Alt / none)
//!                    ├─ ModifierState              (held families)
//!                    └─ KeyObservers::notify       (handled = OR of observers)
//!                  ◄── HookDecision::{Forward, Suppress}
//! ```
//!
//! - **`keys`** – combined key values: a virtual key code plus modifier bits.
//! - **`modifiers`** – modifier families and the held-modifier set.
//! - **`event`** – the record handed to observers and the raw OS record.
//! - **`message`** – keyboard message codes delivered with each raw event.
//! - **`observers`** – ordered multicast list with a shared handled flag.
//! - **`processor`** – the per-event algorithm tying the above together.

pub mod event;
pub mod keys;
pub mod message;
pub mod modifiers;
pub mod observers;
pub mod processor;

pub use event::{KeyDirection, KeyEventRecord, RawKeyEvent};
pub use keys::{Keys, ParseKeyError};
pub use message::KeyMessage;
pub use modifiers::{ModifierFamily, ModifierState};
pub use observers::{KeyObservers, ObserverId};
pub use processor::{HookDecision, KeyHookProcessor, ObserversBusy};
