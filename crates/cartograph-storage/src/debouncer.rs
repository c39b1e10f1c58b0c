//! Event debouncing for source change notification.
//!
//! Editors typically emit several filesystem events per save. The debouncer
//! folds them into one event per path and only releases it once the path has
//! been quiet for the debounce window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::event::{StorageEvent, StorageEventKind};

/// Event waiting for its quiet period to elapse.
struct Pending {
    kind: StorageEventKind,
    deadline: Instant,
}

/// Thread-safe event debouncer keyed by absolute file path.
pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, Pending>>,
    window: Duration,
}

impl EventDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record a raw event, merging it with any pending event for the same path.
    pub fn record(&self, path: PathBuf, kind: StorageEventKind) {
        use std::collections::hash_map::Entry;

        let deadline = Instant::now() + self.window;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        match pending.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut slot) => match Self::merge(slot.get().kind, kind) {
                Some(merged) => {
                    *slot.get_mut() = Pending {
                        kind: merged,
                        deadline,
                    };
                }
                None => {
                    slot.remove();
                }
            },
        }
    }

    /// Merge a pending event kind with a newer one.
    ///
    /// `None` means the pair cancels out: a file created and removed inside
    /// one window never existed as far as consumers are concerned.
    #[allow(clippy::match_same_arms)]
    fn merge(older: StorageEventKind, newer: StorageEventKind) -> Option<StorageEventKind> {
        use StorageEventKind::{Created, Modified, Removed};

        match (older, newer) {
            (Created, Removed) => None,
            (Created, _) => Some(Created),
            (Modified, Created) => Some(Created),
            (Modified, Modified) => Some(Modified),
            (Modified, Removed) => Some(Removed),
            // Replaced in place.
            (Removed, Created) => Some(Modified),
            (Removed, _) => Some(Removed),
        }
    }

    /// Take every event whose quiet period has elapsed, ordered by path.
    pub fn drain_ready(&self) -> Vec<StorageEvent> {
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ready: Vec<StorageEvent> = pending
            .extract_if(|_, event| event.deadline <= now)
            .map(|(path, event)| StorageEvent {
                path,
                kind: event.kind,
            })
            .collect();
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }
}
