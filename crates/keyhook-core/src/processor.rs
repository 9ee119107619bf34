//! The per-event algorithm run by the low-level keyboard hook.
//!
//! [`KeyHookProcessor::process`] is called once for every raw event the OS
//! delivers. Every input, however unexpected, yields a decision.
//!
//! # Algorithm
//!
//! 1. A negative processing code means the event was consumed upstream; forward
//!    it without reading the payload.
//! 2. Decode the message code. Anything other than a key down/up is forwarded.
//! 3. Classify the virtual key. Modifiers only update [`ModifierState`] and
//!    never reach observers.
//! 4. Other keys are combined with the held modifiers and dispatched to the
//!    down or up observers. If any observer marks the record handled the event
//!    is suppressed.
//!
//! Direction always comes from the message code, so a key-repeat down for an
//! already-held modifier simply re-inserts the same family.
//!
//! # Re-entrancy
//!
//! An observer that pumps messages can cause the OS to deliver another event
//! while it is still running. The processor is shared (`&self`) for that
//! reason: modifier state sits in a [`Cell`] and is updated for every event,
//! nested or not. Each observer list sits in its own [`RefCell`]; a nested
//! event for a list that is already notifying is forwarded without
//! notification, and changing a busy list fails with [`ObserversBusy`].

use std::cell::{Cell, RefCell};

use thiserror::Error;

use crate::event::{KeyDirection, KeyEventRecord, RawKeyEvent};
use crate::keys::Keys;
use crate::message::KeyMessage;
use crate::modifiers::{ModifierFamily, ModifierState};
use crate::observers::{KeyObservers, ObserverId};

/// What the hook procedure should do with the event it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    /// Pass the event to the next hook in the chain.
    Forward,
    /// Swallow the event; no further hook or window sees it.
    Suppress,
}

/// An observer list cannot be changed while it is notifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{direction:?} observers cannot be changed while they are being notified")]
pub struct ObserversBusy {
    pub direction: KeyDirection,
}

/// Modifier tracking plus the two observer lists.
///
/// Single-threaded: observers are not `Send`, so the processor stays on the
/// thread that owns the hook.
#[derive(Debug)]
pub struct KeyHookProcessor {
    modifiers: Cell<ModifierState>,
    key_down: RefCell<KeyObservers>,
    key_up: RefCell<KeyObservers>,
}

impl KeyHookProcessor {
    pub fn new() -> Self {
        Self {
            modifiers: Cell::new(ModifierState::new()),
            key_down: RefCell::new(KeyObservers::new(KeyDirection::Down)),
            key_up: RefCell::new(KeyObservers::new(KeyDirection::Up)),
        }
    }

    /// Forgets every held modifier. Called whenever the hook is (re)installed.
    pub fn reset(&self) {
        self.modifiers.set(ModifierState::new());
    }

    /// Snapshot of the held modifiers. Safe to call from inside an observer.
    pub fn modifiers(&self) -> ModifierState {
        self.modifiers.get()
    }

    /// Subscribes to key-down notifications.
    ///
    /// # Errors
    ///
    /// [`ObserversBusy`] when called from inside a key-down observer.
    pub fn on_key_down<F>(&self, observer: F) -> Result<ObserverId, ObserversBusy>
    where
        F: FnMut(&mut KeyEventRecord) + 'static,
    {
        Ok(self.observers_mut(KeyDirection::Down)?.subscribe(observer))
    }

    /// Subscribes to key-up notifications.
    ///
    /// # Errors
    ///
    /// [`ObserversBusy`] when called from inside a key-up observer.
    pub fn on_key_up<F>(&self, observer: F) -> Result<ObserverId, ObserversBusy>
    where
        F: FnMut(&mut KeyEventRecord) + 'static,
    {
        Ok(self.observers_mut(KeyDirection::Up)?.subscribe(observer))
    }

    /// Removes a subscription made with [`on_key_down`](Self::on_key_down) or
    /// [`on_key_up`](Self::on_key_up). `Ok(false)` if it was already gone.
    ///
    /// # Errors
    ///
    /// [`ObserversBusy`] when the subscription's list is notifying.
    pub fn remove_observer(&self, id: ObserverId) -> Result<bool, ObserversBusy> {
        Ok(self.observers_mut(id.direction())?.unsubscribe(id))
    }

    /// Runs one raw OS event through the hook algorithm.
    ///
    /// `n_code` is the hook processing code and `message` the `wParam` message
    /// code, both exactly as the OS passed them.
    pub fn process(&self, n_code: i32, message: u32, raw: &RawKeyEvent) -> HookDecision {
        if n_code < 0 {
            return HookDecision::Forward;
        }

        let Some(message) = KeyMessage::from_code(message) else {
            return HookDecision::Forward;
        };

        let key = raw.key();
        let direction = message.direction();

        let handled = match (direction, ModifierFamily::from_key(key)) {
            (KeyDirection::Down, Some(family)) => {
                self.update_modifiers(|state| state.insert(family));
                false
            }
            (KeyDirection::Up, Some(family)) => {
                self.update_modifiers(|state| state.remove(family));
                false
            }
            (direction, None) => self.dispatch(self.modifiers().apply(key), direction),
        };

        if handled {
            HookDecision::Suppress
        } else {
            HookDecision::Forward
        }
    }

    fn update_modifiers(&self, change: impl FnOnce(&mut ModifierState)) {
        let mut state = self.modifiers.get();
        change(&mut state);
        self.modifiers.set(state);
    }

    fn dispatch(&self, key: Keys, direction: KeyDirection) -> bool {
        let Ok(mut observers) = self.observers_mut(direction) else {
            return false;
        };
        let mut record = KeyEventRecord::new(key, direction);
        observers.notify(&mut record)
    }

    fn observers_mut(
        &self,
        direction: KeyDirection,
    ) -> Result<std::cell::RefMut<'_, KeyObservers>, ObserversBusy> {
        let list = match direction {
            KeyDirection::Down => &self.key_down,
            KeyDirection::Up => &self.key_up,
        };
        list.try_borrow_mut().map_err(|_| ObserversBusy { direction })
    }
}

impl Default for KeyHookProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::message::{WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP};

    /// Subscribes recorders to both notifications and returns the shared log.
    fn record_all(processor: &KeyHookProcessor) -> Rc<RefCell<Vec<KeyEventRecord>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let downs = Rc::clone(&log);
        processor
            .on_key_down(move |r| downs.borrow_mut().push(*r))
            .expect("subscribe");
        let ups = Rc::clone(&log);
        processor
            .on_key_up(move |r| ups.borrow_mut().push(*r))
            .expect("subscribe");
        log
    }

    fn press(processor: &KeyHookProcessor, message: u32, key: Keys) -> HookDecision {
        processor.process(0, message, &RawKeyEvent::from_vk(key.bits()))
    }

    #[test]
    fn test_modifier_down_updates_state_without_notification() {
        // Arrange
        let processor = KeyHookProcessor::new();
        let log = record_all(&processor);

        // Act
        let decision = press(&processor, WM_KEYDOWN, Keys::LCONTROL_KEY);

        // Assert
        assert_eq!(decision, HookDecision::Forward);
        assert!(processor.modifiers().contains(ModifierFamily::Control));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_non_modifier_carries_control_and_alt_bits() {
        // Arrange
        let processor = KeyHookProcessor::new();
        let log = record_all(&processor);
        press(&processor, WM_KEYDOWN, Keys::CONTROL_KEY);
        press(&processor, WM_SYSKEYDOWN, Keys::RMENU);

        // Act
        press(&processor, WM_SYSKEYDOWN, Keys::A);

        // Assert
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].key, Keys::A | Keys::CONTROL | Keys::ALT);
        assert_eq!(log[0].key.modifiers(), Keys::CONTROL | Keys::ALT);
        assert_eq!(log[0].direction, KeyDirection::Down);
    }

    #[test]
    fn test_handled_down_suppresses_event() {
        let processor = KeyHookProcessor::new();
        processor
            .on_key_down(|r| r.handled = r.key == Keys::F12)
            .expect("subscribe");

        assert_eq!(press(&processor, WM_KEYDOWN, Keys::F12), HookDecision::Suppress);
        assert_eq!(press(&processor, WM_KEYDOWN, Keys::F1), HookDecision::Forward);
    }

    #[test]
    fn test_handled_up_suppresses_event() {
        let processor = KeyHookProcessor::new();
        processor.on_key_up(|r| r.handled = true).expect("subscribe");

        assert_eq!(press(&processor, WM_KEYDOWN, Keys::A), HookDecision::Forward);
        assert_eq!(press(&processor, WM_SYSKEYUP, Keys::A), HookDecision::Suppress);
    }

    #[test]
    fn test_consumed_upstream_code_touches_nothing() {
        // Arrange
        let processor = KeyHookProcessor::new();
        let log = record_all(&processor);
        processor.on_key_down(|r| r.handled = true).expect("subscribe");

        // Act
        let modifier = processor.process(-1, WM_KEYDOWN, &RawKeyEvent::from_vk(0xA0));
        let plain = processor.process(-1, WM_KEYDOWN, &RawKeyEvent::from_vk(0x41));

        // Assert
        assert_eq!(modifier, HookDecision::Forward);
        assert_eq!(plain, HookDecision::Forward);
        assert!(processor.modifiers().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unknown_message_code_is_forwarded_untouched() {
        let processor = KeyHookProcessor::new();
        let log = record_all(&processor);

        // WM_CHAR is not a key transition.
        let decision = processor.process(0, 0x0102, &RawKeyEvent::from_vk(0xA0));

        assert_eq!(decision, HookDecision::Forward);
        assert!(processor.modifiers().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_repeated_modifier_down_is_idempotent() {
        let processor = KeyHookProcessor::new();
        for _ in 0..5 {
            press(&processor, WM_KEYDOWN, Keys::LSHIFT_KEY);
        }
        press(&processor, WM_KEYUP, Keys::LSHIFT_KEY);

        assert!(processor.modifiers().is_empty());
    }

    #[test]
    fn test_release_of_other_variant_clears_family() {
        // Left Shift down, generic Shift up: both collapse to one family.
        let processor = KeyHookProcessor::new();
        press(&processor, WM_KEYDOWN, Keys::LSHIFT_KEY);
        press(&processor, WM_KEYUP, Keys::SHIFT_KEY);

        assert!(processor.modifiers().is_empty());
    }

    #[test]
    fn test_reset_clears_stale_modifiers() {
        let processor = KeyHookProcessor::new();
        press(&processor, WM_KEYDOWN, Keys::LMENU);

        processor.reset();

        assert!(processor.modifiers().is_empty());
    }

    #[test]
    fn test_removed_observer_no_longer_suppresses() {
        let processor = KeyHookProcessor::new();
        let id = processor.on_key_down(|r| r.handled = true).expect("subscribe");
        assert_eq!(press(&processor, WM_KEYDOWN, Keys::A), HookDecision::Suppress);

        assert_eq!(processor.remove_observer(id), Ok(true));

        assert_eq!(press(&processor, WM_KEYDOWN, Keys::A), HookDecision::Forward);
    }

    #[test]
    fn test_modifier_events_are_forwarded_even_if_observers_would_suppress() {
        let processor = KeyHookProcessor::new();
        processor.on_key_down(|r| r.handled = true).expect("subscribe");
        processor.on_key_up(|r| r.handled = true).expect("subscribe");

        assert_eq!(press(&processor, WM_KEYDOWN, Keys::RCONTROL_KEY), HookDecision::Forward);
        assert_eq!(press(&processor, WM_KEYUP, Keys::RCONTROL_KEY), HookDecision::Forward);
    }

    #[test]
    fn test_nested_modifier_release_during_notification_is_tracked() {
        // Arrange – the down observer triggers a nested Control release, as a
        // message-pumping observer would.
        let processor = Rc::new(KeyHookProcessor::new());
        press(&processor, WM_KEYDOWN, Keys::LCONTROL_KEY);
        let inner = Rc::downgrade(&processor);
        let nested = Rc::new(Cell::new(None));
        let nested_decision = Rc::clone(&nested);
        processor
            .on_key_down(move |r| {
                r.handled = true;
                if let Some(inner) = inner.upgrade() {
                    nested_decision.set(Some(press(&inner, WM_KEYUP, Keys::LCONTROL_KEY)));
                }
            })
            .expect("subscribe");

        // Act
        let outer = press(&processor, WM_KEYDOWN, Keys::A);

        // Assert
        assert_eq!(outer, HookDecision::Suppress);
        assert_eq!(nested.get(), Some(HookDecision::Forward));
        assert!(processor.modifiers().is_empty());
    }

    #[test]
    fn test_nested_key_for_busy_list_is_forwarded_without_notification() {
        let processor = Rc::new(KeyHookProcessor::new());
        let inner = Rc::downgrade(&processor);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let nested = Rc::new(Cell::new(None));
        let nested_decision = Rc::clone(&nested);
        processor
            .on_key_down(move |r| {
                counter.set(counter.get() + 1);
                r.handled = true;
                if let Some(inner) = inner.upgrade() {
                    nested_decision.set(Some(press(&inner, WM_KEYDOWN, Keys::SPACE)));
                }
            })
            .expect("subscribe");

        let outer = press(&processor, WM_KEYDOWN, Keys::A);

        assert_eq!(outer, HookDecision::Suppress);
        assert_eq!(nested.get(), Some(HookDecision::Forward));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_changing_a_busy_list_reports_busy() {
        // Arrange
        let processor = Rc::new(KeyHookProcessor::new());
        let inner = Rc::downgrade(&processor);
        let results = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&results);
        processor
            .on_key_down(move |_| {
                if let Some(inner) = inner.upgrade() {
                    seen.borrow_mut().push(inner.on_key_down(|_| {}).map(|_| ()));
                    seen.borrow_mut().push(inner.on_key_up(|_| {}).map(|_| ()));
                }
            })
            .expect("subscribe");

        // Act
        press(&processor, WM_KEYDOWN, Keys::A);

        // Assert – only the list being notified is locked
        assert_eq!(
            *results.borrow(),
            vec![
                Err(ObserversBusy {
                    direction: KeyDirection::Down
                }),
                Ok(()),
            ]
        );
    }
}
