//! Change events and the multicast notification channel.
//!
//! Every accepted write on a [`PreferenceStore`](crate::PreferenceStore)
//! produces exactly one [`ChangeEvent`], in acceptance order, fanned out to
//! all subscribers over `tokio::sync::broadcast`. Delivery is
//! back-pressure-free: events are cheap and a slow subscriber lags rather
//! than stalling the writer.

use tokio::sync::broadcast;

/// Default capacity of the per-store broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A single accepted write, emitted synchronously at acceptance time (not
/// deferred to flush time).
///
/// `new_value` is `None` for removals — the same "null means remove"
/// convention the store contract uses for `set_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Identity of the store that accepted the write (e.g. `"local"`,
    /// `"sync"`, `"memory"`).
    pub store: String,
    /// The affected key.
    pub key: String,
    /// The accepted value, or `None` if the key was removed.
    pub new_value: Option<String>,
}

/// Multicast fan-out wrapper over a broadcast sender.
///
/// Stores hold one of these and call [`emit`](Self::emit) while still inside
/// their state lock so that event order matches acceptance order.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Opens a new subscription. Events emitted before this call are not
    /// replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event to all current subscribers.
    ///
    /// A send with no subscribers is not an error: stores emit
    /// unconditionally and the event is simply dropped.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
