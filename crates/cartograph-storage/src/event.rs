//! Storage event types for change notification.
//!
//! Provides types for subscribing to source changes through the
//! [`Storage::watch`](crate::Storage::watch) method.

use std::path::PathBuf;
use std::sync::mpsc;

/// Kind of storage event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageEventKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

/// A storage change event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: StorageEventKind,
}

impl StorageEvent {
    /// Create an event for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: StorageEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receiver for storage events.
///
/// Events arrive already debounced. Batches are drained by blocking on
/// [`recv()`](Self::recv) and then polling [`try_recv()`](Self::try_recv).
pub struct StorageEventReceiver {
    rx: mpsc::Receiver<StorageEvent>,
}

impl StorageEventReceiver {
    /// Create a new receiver from a channel receiver.
    pub(crate) fn new(rx: mpsc::Receiver<StorageEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Returns `None` when the sender is dropped.
    #[must_use]
    pub fn recv(&self) -> Option<StorageEvent> {
        self.rx.recv().ok()
    }

    /// Wait for the next event, giving up after `timeout`.
    ///
    /// Returns `None` on timeout or when the sender is dropped.
    #[must_use]
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<StorageEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is available or the sender is dropped.
    #[must_use]
    pub fn try_recv(&self) -> Option<StorageEvent> {
        self.rx.try_recv().ok()
    }

    /// Create a no-op receiver that never yields events.
    ///
    /// Used by the default `Storage::watch()` implementation for backends
    /// that don't support change notification.
    pub(crate) fn no_op() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }
}

/// Handle to stop watching for changes.
///
/// Dropping the handle stops watching. Shutdown is signalled by dropping the
/// internal channel sender.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    /// Create a new watch handle with a shutdown signal sender.
    pub(crate) fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(mut self) {
        self._shutdown.take();
    }

    /// Create a no-op handle that does nothing on drop.
    pub(crate) fn no_op() -> Self {
        Self { _shutdown: None }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_receiver_recv_blocking() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);
        let event = StorageEvent::new("/site/docs/intro.md", StorageEventKind::Created);

        tx.send(event.clone()).unwrap();

        assert_eq!(receiver.recv(), Some(event));
    }

    #[test]
    fn test_receiver_recv_on_closed_channel() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);

        drop(tx);

        assert!(receiver.recv().is_none());
    }

    #[test]
    fn test_receiver_recv_timeout_expires() {
        let (_tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);

        assert!(receiver.recv_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_receiver_drains_batch_with_try_recv() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);
        tx.send(StorageEvent::new("a.md", StorageEventKind::Created)).unwrap();
        tx.send(StorageEvent::new("b.md", StorageEventKind::Removed)).unwrap();

        let first = receiver.recv().unwrap();
        let rest: Vec<_> = std::iter::from_fn(|| receiver.try_recv()).collect();

        assert_eq!(first.path, PathBuf::from("a.md"));
        assert_eq!(rest, vec![StorageEvent::new("b.md", StorageEventKind::Removed)]);
    }

    #[test]
    fn test_receiver_no_op() {
        let receiver = StorageEventReceiver::no_op();
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_watch_handle_drop_closes_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        drop(handle);

        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_watch_handle_stop() {
        let (tx, rx) = mpsc::channel();
        WatchHandle::new(tx).stop();
        assert!(rx.recv().is_err());

        WatchHandle::no_op().stop();
    }

    #[test]
    fn test_handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WatchHandle>();
        assert_send::<StorageEventReceiver>();
    }
}
