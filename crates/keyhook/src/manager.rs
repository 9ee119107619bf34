//! Hook Manager: owns the system-wide keyboard hook registration.
//!
//! # Lifetime of the callback state
//!
//! Once registered, the OS may call the hook procedure at any time the owning
//! thread pumps messages. The procedure reaches the manager's
//! [`KeyHookProcessor`] through a thread-local slot. The slot holds a strong
//! reference that is taken when the hook is installed and released only when
//! the registration is dropped, so the processor can never be freed while the
//! OS still holds the hook.
//!
//! # Threading
//!
//! `HookManager` is `!Send`. Low-level hooks are delivered on the thread that
//! installed them, and modifier state is only ever touched there.
//!
//! # Observers
//!
//! Observers run synchronously inside the OS callback and stall keyboard input
//! for the whole desktop until they return. Keep them short.
//!
//! An observer may query the manager, subscribe to the other notification or
//! uninstall the hook. Changing the observer list that is currently notifying
//! returns [`HookError::ObserversBusy`]. A panicking observer is contained in
//! [`dispatch`]: the remaining observers are skipped and the event is forwarded.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use keyhook_core::{HookDecision, KeyEventRecord, KeyHookProcessor, ModifierState, ObserverId, RawKeyEvent};
use tracing::{debug, info, warn};

use crate::error::HookError;
use crate::platform::{HookHandle, HookPlatform};

/// Value a hook procedure returns to swallow an event.
pub const SUPPRESS_RESULT: isize = 1;

thread_local! {
    /// The installed processor for this thread, if any.
    static ACTIVE_HOOK: RefCell<Option<ActiveHook>> = const { RefCell::new(None) };
}

struct ActiveHook {
    handle: Option<HookHandle>,
    processor: Rc<KeyHookProcessor>,
}

/// Occupies the thread-local slot; clears it on drop.
struct SlotGuard {
    _thread_bound: PhantomData<Rc<()>>,
}

impl SlotGuard {
    fn claim(processor: &Rc<KeyHookProcessor>) -> Result<Self, HookError> {
        ACTIVE_HOOK.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(HookError::AlreadyActive);
            }
            *slot = Some(ActiveHook {
                handle: None,
                processor: Rc::clone(processor),
            });
            Ok(SlotGuard {
                _thread_bound: PhantomData,
            })
        })
    }

    fn set_handle(&self, handle: HookHandle) {
        ACTIVE_HOOK.with(|slot| {
            if let Some(active) = slot.borrow_mut().as_mut() {
                active.handle = Some(handle);
            }
        });
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Take the reference out first and drop it after the slot borrow ends:
        // dropping the processor runs observer destructors.
        let released = ACTIVE_HOOK
            .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
            .ok()
            .flatten();
        drop(released);
    }
}

/// A live OS registration. Dropping it releases the callback state.
struct Registration {
    handle: HookHandle,
    _slot: SlotGuard,
}

/// Installs and removes the low-level keyboard hook and dispatches key events
/// to observers.
pub struct HookManager<P: HookPlatform> {
    platform: P,
    processor: Rc<KeyHookProcessor>,
    registration: Option<Registration>,
}

#[cfg(target_os = "windows")]
impl HookManager<crate::platform::windows::WindowsHookPlatform> {
    /// Creates an uninstalled manager backed by the real Windows hook.
    pub fn new() -> Self {
        Self::with_platform(crate::platform::windows::WindowsHookPlatform)
    }
}

#[cfg(target_os = "windows")]
impl Default for HookManager<crate::platform::windows::WindowsHookPlatform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: HookPlatform> HookManager<P> {
    /// Creates an uninstalled manager on top of `platform`.
    pub fn with_platform(platform: P) -> Self {
        Self {
            platform,
            processor: Rc::new(KeyHookProcessor::new()),
            registration: None,
        }
    }

    /// Registers the hook. Does nothing if this manager is already installed.
    ///
    /// Held modifiers are forgotten on every successful or attempted install.
    ///
    /// # Errors
    ///
    /// - [`HookError::AlreadyActive`] if another manager is installed on this
    ///   thread.
    /// - [`HookError::PlatformRegistration`] if the OS refuses the hook.
    pub fn install(&mut self) -> Result<(), HookError> {
        if let Some(registration) = &self.registration {
            debug!(handle = %registration.handle, "keyboard hook already installed");
            return Ok(());
        }

        let slot = SlotGuard::claim(&self.processor)?;
        self.processor.reset();

        // On failure `slot` drops here and releases the processor again.
        let handle = self.platform.register()?;
        slot.set_handle(handle);

        self.registration = Some(Registration {
            handle,
            _slot: slot,
        });
        info!(%handle, "keyboard hook installed");
        Ok(())
    }

    /// Removes the hook. Does nothing if this manager is not installed.
    ///
    /// The local registration is cleared even when the OS reports failure, so
    /// a later [`install`](Self::install) starts from a clean state.
    ///
    /// # Errors
    ///
    /// [`HookError::PlatformRegistration`] if the OS deregistration fails.
    pub fn uninstall(&mut self) -> Result<(), HookError> {
        let Some(registration) = self.registration.take() else {
            return Ok(());
        };

        let handle = registration.handle;
        let result = self.platform.unregister(handle);
        drop(registration);

        match &result {
            Ok(()) => info!(%handle, "keyboard hook removed"),
            Err(e) => warn!(%handle, error = %e, "keyboard hook removal failed; registration discarded"),
        }
        result
    }

    /// Returns `true` while the hook is registered.
    pub fn is_installed(&self) -> bool {
        self.registration.is_some()
    }

    /// The OS handle of the current registration.
    pub fn handle(&self) -> Option<HookHandle> {
        self.registration.as_ref().map(|r| r.handle)
    }

    /// Snapshot of the modifiers the hook currently believes are held.
    pub fn modifiers(&self) -> ModifierState {
        self.processor.modifiers()
    }

    /// Subscribes to key-down notifications for non-modifier keys.
    ///
    /// # Errors
    ///
    /// [`HookError::ObserversBusy`] when called from a key-down observer.
    pub fn on_key_down<F>(&self, observer: F) -> Result<ObserverId, HookError>
    where
        F: FnMut(&mut KeyEventRecord) + 'static,
    {
        Ok(self.processor.on_key_down(observer)?)
    }

    /// Subscribes to key-up notifications for non-modifier keys.
    ///
    /// # Errors
    ///
    /// [`HookError::ObserversBusy`] when called from a key-up observer.
    pub fn on_key_up<F>(&self, observer: F) -> Result<ObserverId, HookError>
    where
        F: FnMut(&mut KeyEventRecord) + 'static,
    {
        Ok(self.processor.on_key_up(observer)?)
    }

    /// Removes a subscription. `Ok(false)` if it was already gone.
    ///
    /// # Errors
    ///
    /// [`HookError::ObserversBusy`] when the subscription's list is notifying.
    pub fn remove_observer(&self, id: ObserverId) -> Result<bool, HookError> {
        Ok(self.processor.remove_observer(id)?)
    }
}

impl<P: HookPlatform> Drop for HookManager<P> {
    fn drop(&mut self) {
        // uninstall() already logs failures.
        let _ = self.uninstall();
    }
}

/// Runs one OS hook event through the processor installed on this thread.
///
/// `raw` is `None` when the procedure could not or must not read the payload.
/// `forward` continues the hook chain and receives the installed handle.
/// Returns [`SUPPRESS_RESULT`] or the result of `forward`.
///
/// Never panics and never logs. With no hook installed on this thread, or
/// when an observer panics, the event is forwarded untouched.
pub fn dispatch<F>(n_code: i32, message: u32, raw: Option<&RawKeyEvent>, forward: F) -> isize
where
    F: FnOnce(Option<HookHandle>) -> isize,
{
    let active = ACTIVE_HOOK
        .try_with(|slot| {
            slot.try_borrow()
                .ok()
                .and_then(|slot| slot.as_ref().map(|a| (a.handle, Rc::clone(&a.processor))))
        })
        .ok()
        .flatten();

    let Some((handle, processor)) = active else {
        return forward(None);
    };

    // Unwinding out of the OS callback would abort the process.
    let decision = match raw {
        Some(raw) => panic::catch_unwind(AssertUnwindSafe(|| processor.process(n_code, message, raw)))
            .unwrap_or(HookDecision::Forward),
        None => HookDecision::Forward,
    };

    match decision {
        HookDecision::Suppress => SUPPRESS_RESULT,
        HookDecision::Forward => forward(handle),
    }
}

#[cfg(test)]
mod tests {
    use keyhook_core::message::WM_KEYDOWN;

    use super::*;

    #[test]
    fn test_dispatch_without_installed_hook_forwards_with_no_handle() {
        // Arrange
        let mut seen = Some(HookHandle::new(1));

        // Act
        let result = dispatch(0, WM_KEYDOWN, Some(&RawKeyEvent::from_vk(0x41)), |handle| {
            seen = Some(handle);
            42
        });

        // Assert
        assert_eq!(result, 42);
        assert_eq!(seen, Some(None));
    }

    #[test]
    fn test_slot_guard_rejects_second_claim_and_clears_on_drop() {
        let first = Rc::new(KeyHookProcessor::new());
        let second = Rc::new(KeyHookProcessor::new());

        let guard = SlotGuard::claim(&first).expect("slot is free");
        assert_eq!(Rc::strong_count(&first), 2);
        assert!(matches!(SlotGuard::claim(&second), Err(HookError::AlreadyActive)));

        drop(guard);

        assert_eq!(Rc::strong_count(&first), 1, "slot must release its reference");
        let again = SlotGuard::claim(&second);
        assert!(again.is_ok());
    }

    #[test]
    fn test_dispatch_with_null_payload_forwards() {
        let processor = Rc::new(KeyHookProcessor::new());
        processor.on_key_down(|r| r.handled = true).expect("subscribe");
        let _guard = SlotGuard::claim(&processor).expect("slot is free");

        let result = dispatch(0, WM_KEYDOWN, None, |_| 7);

        assert_eq!(result, 7);
    }

    #[test]
    fn test_dispatch_suppresses_when_observer_handles() {
        let processor = Rc::new(KeyHookProcessor::new());
        processor.on_key_down(|r| r.handled = true).expect("subscribe");
        let _guard = SlotGuard::claim(&processor).expect("slot is free");

        let result = dispatch(0, WM_KEYDOWN, Some(&RawKeyEvent::from_vk(0x41)), |_| 7);

        assert_eq!(result, SUPPRESS_RESULT);
    }

    #[test]
    fn test_dispatch_contains_observer_panic_and_forwards() {
        // Arrange
        let processor = Rc::new(KeyHookProcessor::new());
        processor
            .on_key_down(|r| {
                r.handled = true;
                panic!("observer failure");
            })
            .expect("subscribe");
        let _guard = SlotGuard::claim(&processor).expect("slot is free");

        // Act
        let result = dispatch(0, WM_KEYDOWN, Some(&RawKeyEvent::from_vk(0x41)), |_| 7);

        // Assert – the list is usable again after the unwind
        assert_eq!(result, 7);
        assert!(processor.on_key_down(|_| {}).is_ok());
    }
}
