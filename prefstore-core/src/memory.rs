//! Pure in-memory implementation of [`PreferenceStore`].
//!
//! Synchronous semantics wrapped in the asynchronous contract: every future
//! resolves immediately. There is no backing store, so `flush()` only
//! resets the dirty flag. Useful as the default store for ephemeral
//! consumers and as a null-object / test double satisfying the full
//! interface.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::event::{ChangeEvent, ChangeNotifier, DEFAULT_EVENT_CAPACITY};
use crate::store::{BoxFuture, PreferenceStore};
use crate::PrefResult;

/// In-memory [`PreferenceStore`].
#[derive(Debug)]
pub struct InMemoryStore {
    name: String,
    state: Mutex<InMemoryState>,
    notifier: ChangeNotifier,
}

#[derive(Debug, Default)]
struct InMemoryState {
    values: HashMap<String, String>,
    dirty: bool,
}

impl InMemoryStore {
    /// Creates an empty store with identity `"memory"`.
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    /// Creates an empty store with an explicit identity, used as the
    /// `store` field of emitted events.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(InMemoryState::default()),
            notifier: ChangeNotifier::new(DEFAULT_EVENT_CAPACITY),
        }
    }

    // Lock is held while emitting so event order matches acceptance order.
    fn accept(&self, key: &str, value: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        match value {
            Some(v) => {
                state.values.insert(key.to_string(), v.to_string());
            }
            None => {
                // Removing an absent key is a no-op: no event, no dirty
                // mark.
                if state.values.remove(key).is_none() {
                    return;
                }
            }
        }
        state.dirty = true;
        self.notifier.emit(ChangeEvent {
            store: self.name.clone(),
            key: key.to_string(),
            new_value: value.map(str::to_string),
        });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for InMemoryStore {
    fn get_value<'a>(&'a self, key: &'a str, default: &'a str) -> BoxFuture<'a, PrefResult<String>> {
        let value = {
            let state = self.state.lock().unwrap();
            state
                .values
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        Box::pin(async move { Ok(value) })
    }

    fn set_value<'a>(
        &'a self,
        key: &'a str,
        value: Option<&'a str>,
    ) -> BoxFuture<'a, PrefResult<Option<String>>> {
        self.accept(key, value);
        let accepted = value.map(str::to_string);
        Box::pin(async move { Ok(accepted) })
    }

    fn remove_value<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, PrefResult<()>> {
        for key in keys {
            self.accept(key, None);
        }
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> BoxFuture<'_, PrefResult<()>> {
        let mut state = self.state.lock().unwrap();
        let removed: Vec<String> = state.values.keys().cloned().collect();
        state.values.clear();
        state.dirty = true;
        for key in removed {
            self.notifier.emit(ChangeEvent {
                store: self.name.clone(),
                key,
                new_value: None,
            });
        }
        drop(state);
        Box::pin(async { Ok(()) })
    }

    fn flush(&self) -> BoxFuture<'_, PrefResult<()>> {
        // No backing store: flushing only resets the dirty flag.
        self.state.lock().unwrap().dirty = false;
        Box::pin(async { Ok(()) })
    }

    fn is_dirty(&self) -> bool {
        self.state.lock().unwrap().dirty
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    fn store_name(&self) -> &str {
        &self.name
    }
}
