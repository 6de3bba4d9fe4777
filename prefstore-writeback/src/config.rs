//! Configuration for [`WritebackCacheStore`](crate::WritebackCacheStore).

use std::time::Duration;

use prefstore_core::DEFAULT_EVENT_CAPACITY;

/// Debounce interval used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Configuration for a write-back cache store.
#[derive(Debug, Clone)]
pub struct WritebackConfig {
    /// Logical storage area this store owns. Doubles as the store identity
    /// on emitted change events and as the filter for external change
    /// notifications (e.g. `"local"` vs `"sync"`).
    pub area: String,
    /// Fixed debounce interval: the first write after the cache becomes
    /// clean arms one timer of this length; later writes within the window
    /// do not restart it, so write latency stays bounded.
    pub debounce: Duration,
    /// Capacity of the change-event broadcast channel.
    pub event_capacity: usize,
}

impl WritebackConfig {
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            debounce: DEFAULT_DEBOUNCE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for WritebackConfig {
    fn default() -> Self {
        Self::new("local")
    }
}
