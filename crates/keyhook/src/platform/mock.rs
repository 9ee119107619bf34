//! Mock hook platform for unit and integration testing.
//!
//! Stands in for the OS: hands out fake handles, can be told to fail the next
//! registration call, and delivers synthetic events through
//! [`crate::manager::dispatch`] exactly as the real hook procedure does.
//!
//! Clones share state, so a test can keep one clone after moving another into
//! a [`HookManager`](crate::HookManager).

use std::cell::RefCell;
use std::rc::Rc;

use keyhook_core::{Keys, RawKeyEvent};

use super::{HookHandle, HookPlatform};
use crate::error::{HookError, HookOperation};
use crate::manager;

/// Result the mock chain returns when an event is forwarded, unless changed
/// with [`MockHookPlatform::set_chain_result`].
pub const DEFAULT_CHAIN_RESULT: isize = 0;

#[derive(Debug)]
struct MockState {
    next_handle: isize,
    active: Option<HookHandle>,
    register_calls: u32,
    unregister_calls: u32,
    fail_register: Option<u32>,
    fail_unregister: Option<u32>,
    chain_result: isize,
    forwarded: Vec<Option<HookHandle>>,
}

/// A fake OS hook facility.
#[derive(Debug, Clone)]
pub struct MockHookPlatform {
    state: Rc<RefCell<MockState>>,
}

impl MockHookPlatform {
    /// Creates a mock with no registrations.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                next_handle: 0x1000,
                active: None,
                register_calls: 0,
                unregister_calls: 0,
                fail_register: None,
                fail_unregister: None,
                chain_result: DEFAULT_CHAIN_RESULT,
                forwarded: Vec::new(),
            })),
        }
    }

    /// Makes the next `register` call fail with OS error `code`.
    pub fn fail_next_register(&self, code: u32) {
        self.state.borrow_mut().fail_register = Some(code);
    }

    /// Makes the next `unregister` call fail with OS error `code`.
    pub fn fail_next_unregister(&self, code: u32) {
        self.state.borrow_mut().fail_unregister = Some(code);
    }

    /// Sets what the rest of the hook chain returns for forwarded events.
    pub fn set_chain_result(&self, result: isize) {
        self.state.borrow_mut().chain_result = result;
    }

    /// Number of `register` calls, including failed ones.
    pub fn register_calls(&self) -> u32 {
        self.state.borrow().register_calls
    }

    /// Number of `unregister` calls, including failed ones.
    pub fn unregister_calls(&self) -> u32 {
        self.state.borrow().unregister_calls
    }

    /// The handle the fake OS currently considers registered.
    pub fn active_handle(&self) -> Option<HookHandle> {
        self.state.borrow().active
    }

    /// Handles passed to the chain continuation, one entry per forwarded event.
    pub fn forwarded(&self) -> Vec<Option<HookHandle>> {
        self.state.borrow().forwarded.clone()
    }

    /// Delivers one raw event as the OS would, returning the hook's result.
    ///
    /// Like the real system, nothing reaches the hook when no registration is
    /// active; the event goes straight down the chain.
    pub fn deliver(&self, n_code: i32, message: u32, raw: &RawKeyEvent) -> isize {
        let registered = self.state.borrow().active.is_some();
        if !registered {
            return self.continue_chain(None);
        }
        manager::dispatch(n_code, message, Some(raw), |handle| self.continue_chain(handle))
    }

    /// Delivers an `HC_ACTION` event for `key` with message code `message`.
    pub fn deliver_key(&self, message: u32, key: Keys) -> isize {
        self.deliver(0, message, &RawKeyEvent::from_vk(key.bits()))
    }

    fn continue_chain(&self, handle: Option<HookHandle>) -> isize {
        let mut state = self.state.borrow_mut();
        state.forwarded.push(handle);
        state.chain_result
    }
}

impl Default for MockHookPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HookPlatform for MockHookPlatform {
    fn register(&self) -> Result<HookHandle, HookError> {
        let mut state = self.state.borrow_mut();
        state.register_calls += 1;

        if let Some(code) = state.fail_register.take() {
            return Err(HookError::PlatformRegistration {
                operation: HookOperation::Install,
                code,
            });
        }

        let raw = state.next_handle;
        state.next_handle += 0x10;
        let handle = HookHandle::new(raw).ok_or(HookError::PlatformRegistration {
            operation: HookOperation::Install,
            code: 0,
        })?;
        state.active = Some(handle);
        Ok(handle)
    }

    fn unregister(&self, handle: HookHandle) -> Result<(), HookError> {
        let mut state = self.state.borrow_mut();
        state.unregister_calls += 1;

        if let Some(code) = state.fail_unregister.take() {
            return Err(HookError::PlatformRegistration {
                operation: HookOperation::Uninstall,
                code,
            });
        }

        if state.active != Some(handle) {
            // ERROR_INVALID_HOOK_HANDLE
            return Err(HookError::PlatformRegistration {
                operation: HookOperation::Uninstall,
                code: 1404,
            });
        }
        state.active = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_hands_out_distinct_handles() {
        // Arrange
        let platform = MockHookPlatform::new();

        // Act
        let first = platform.register().expect("register");
        platform.unregister(first).expect("unregister");
        let second = platform.register().expect("register");

        // Assert
        assert_ne!(first, second);
        assert_eq!(platform.active_handle(), Some(second));
        assert_eq!(platform.register_calls(), 2);
    }

    #[test]
    fn test_failure_injection_applies_to_one_call_only() {
        let platform = MockHookPlatform::new();
        platform.fail_next_register(5);

        let err = platform.register().expect_err("injected failure");
        assert_eq!(err.os_code(), Some(5));
        assert!(platform.register().is_ok());
    }

    #[test]
    fn test_unregister_of_unknown_handle_fails() {
        let platform = MockHookPlatform::new();
        let bogus = HookHandle::new(0x42).expect("non-zero");

        let err = platform.unregister(bogus).expect_err("not registered");

        assert_eq!(err.os_code(), Some(1404));
    }

    #[test]
    fn test_deliver_without_registration_goes_straight_down_the_chain() {
        let platform = MockHookPlatform::new();
        platform.set_chain_result(9);

        let result = platform.deliver_key(0x0100, Keys::A);

        assert_eq!(result, 9);
        assert_eq!(platform.forwarded(), vec![None]);
    }
}
