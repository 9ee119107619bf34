//! Ordered multicast list of key observers.
//!
//! Every observer is called, in subscription order, with the same record. The
//! result of a notification is the OR of the `handled` flag after each call. The
//! running OR is written back to the record, so a later observer clearing the
//! flag cannot undo an earlier observer's request.
//!
//! Observers run inside the OS hook callback. They must return promptly: while
//! one runs, keyboard input is stalled for every process on the desktop.

use std::fmt;

use crate::event::{KeyDirection, KeyEventRecord};

/// Boxed observer callback.
pub type KeyObserver = Box<dyn FnMut(&mut KeyEventRecord)>;

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId {
    direction: KeyDirection,
    seq: u64,
}

impl ObserverId {
    /// The notification this subscription belongs to.
    pub fn direction(&self) -> KeyDirection {
        self.direction
    }
}

/// Observers of one notification (key down or key up).
pub struct KeyObservers {
    direction: KeyDirection,
    next_seq: u64,
    entries: Vec<(ObserverId, KeyObserver)>,
}

impl KeyObservers {
    /// Creates an empty list for `direction` notifications.
    pub fn new(direction: KeyDirection) -> Self {
        Self {
            direction,
            next_seq: 0,
            entries: Vec::new(),
        }
    }

    /// Appends an observer; it runs after every existing one.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&mut KeyEventRecord) + 'static,
    {
        let id = ObserverId {
            direction: self.direction,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.push((id, Box::new(observer)));
        id
    }

    /// Removes a subscription. Returns `false` if `id` is not in this list.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Invokes every observer with `record` and returns the aggregated handled flag.
    pub fn notify(&mut self, record: &mut KeyEventRecord) -> bool {
        let mut handled = record.handled;
        for (_, observer) in &mut self.entries {
            observer(&mut *record);
            handled |= record.handled;
            record.handled = handled;
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for KeyObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyObservers")
            .field("direction", &self.direction)
            .field("observers", &self.entries.len())
            .finish()
    }
}
