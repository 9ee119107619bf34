//! Observer wiring for the `keyhook-monitor` host.
//!
//! [`KeyMonitor::attach`] subscribes two observers to a [`HookManager`]:
//!
//! - a key-down observer that optionally logs every key and swallows the
//!   chords listed in the config;
//! - a key-up observer that swallows the release of every key whose press was
//!   swallowed.
//!
//! Releases are matched on the base key, because the user may let go of a
//! modifier before the key itself (Ctrl+Alt+F12 is often released as Ctrl, Alt,
//! F12). Without this an application would receive a lone F12 key-up.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use keyhook_core::{KeyEventRecord, Keys, ObserverId};
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::error::HookError;
use crate::manager::HookManager;
use crate::platform::HookPlatform;

/// Chords to swallow. A chord matches only with exactly its modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionRules {
    chords: HashSet<Keys>,
}

impl SuppressionRules {
    pub fn new(chords: impl IntoIterator<Item = Keys>) -> Self {
        Self {
            chords: chords.into_iter().collect(),
        }
    }

    /// Returns `true` if `key` (with its modifiers) is a configured chord.
    pub fn matches(&self, key: Keys) -> bool {
        self.chords.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

/// Subscriptions made by [`KeyMonitor::attach`].
#[derive(Debug)]
pub struct KeyMonitor {
    key_down: ObserverId,
    key_up: ObserverId,
    swallowed: Rc<RefCell<HashSet<u16>>>,
}

impl KeyMonitor {
    /// Subscribes the monitor observers described by `config` to `manager`.
    ///
    /// # Errors
    ///
    /// [`HookError::ObserversBusy`] when called from inside an observer.
    pub fn attach<P: HookPlatform>(
        manager: &HookManager<P>,
        config: &MonitorConfig,
    ) -> Result<Self, HookError> {
        let rules = SuppressionRules::new(config.suppress.keys.iter().copied());
        let log_keys = config.monitor.log_key_events;
        let swallowed = Rc::new(RefCell::new(HashSet::new()));

        if !rules.is_empty() {
            info!(chords = rules.len(), "key suppression rules loaded");
        }

        let pressed = Rc::clone(&swallowed);
        let key_down = manager.on_key_down(move |record: &mut KeyEventRecord| {
            if log_keys {
                debug!(key = %record.key, "key down");
            }
            if rules.matches(record.key) {
                record.handled = true;
                pressed.borrow_mut().insert(record.key.code());
                info!(key = %record.key, "key chord suppressed");
            }
        })?;

        let released = Rc::clone(&swallowed);
        let key_up = manager.on_key_up(move |record: &mut KeyEventRecord| {
            if log_keys {
                debug!(key = %record.key, "key up");
            }
            if released.borrow_mut().remove(&record.key.code()) {
                record.handled = true;
            }
        });
        let key_up = match key_up {
            Ok(id) => id,
            Err(e) => {
                let _ = manager.remove_observer(key_down);
                return Err(e);
            }
        };

        Ok(Self {
            key_down,
            key_up,
            swallowed,
        })
    }

    /// Removes the monitor observers from `manager`.
    ///
    /// # Errors
    ///
    /// [`HookError::ObserversBusy`] when called from inside an observer.
    pub fn detach<P: HookPlatform>(self, manager: &HookManager<P>) -> Result<(), HookError> {
        manager.remove_observer(self.key_down)?;
        manager.remove_observer(self.key_up)?;
        Ok(())
    }

    /// Number of swallowed presses whose release has not been seen yet.
    pub fn pending_releases(&self) -> usize {
        self.swallowed.borrow().len()
    }
}
