//! The layered default/override JSON store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use prefstore_core::{PrefError, PrefResult, PreferenceStore, DEFAULT_EVENT_CAPACITY};

/// Reserved key the user-override blob is stored under.
pub const USER_PREFS_KEY: &str = "customJsonPrefs";
/// Reserved key the defaults blob is stored under.
pub const DEFAULT_PREFS_KEY: &str = "defaultJsonPrefs";

/// A change to one preference id, JSON-decoded.
///
/// `new_value: None` means the override for this id was removed (the
/// effective value falls back to the default layer, if any).
#[derive(Debug, Clone, PartialEq)]
pub struct JsonChangeEvent {
    pub key: String,
    pub new_value: Option<Value>,
}

/// Default/override preference store serialized as two JSON blobs.
///
/// Construction is two-phase: [`new`](Self::new) is cheap and synchronous,
/// [`ready`](Self::ready) performs the two concurrent blob loads. Reads and
/// writes before `ready` resolves fail loudly with
/// [`PrefError::NotReady`] — callers are required to await readiness once
/// at startup.
///
/// Only the override map is ever mutated after load; the defaults map is
/// read-only at runtime. Every write re-serializes the entire override map
/// into one blob write to the underlying store, bounding write cost by
/// total-preferences-size rather than by the changed key — a deliberate
/// simplicity/cost tradeoff.
pub struct LayeredJsonStore {
    store: Arc<dyn PreferenceStore>,
    maps: Mutex<Option<PrefMaps>>,
    events: broadcast::Sender<JsonChangeEvent>,
}

struct PrefMaps {
    user: HashMap<String, Value>,
    defaults: HashMap<String, Value>,
}

impl LayeredJsonStore {
    /// Wraps `store`. The result is not usable until [`ready`](Self::ready)
    /// has resolved.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            store,
            maps: Mutex::new(None),
            events,
        }
    }

    /// Loads both blobs concurrently and decodes them.
    ///
    /// A malformed blob fails the whole load with [`PrefError::Decode`];
    /// the store stays not-ready rather than masking possible data loss
    /// with an empty map. A missing blob decodes as an empty object.
    pub async fn ready(&self) -> PrefResult<()> {
        let (user_blob, default_blob) = tokio::join!(
            self.store.get_value(USER_PREFS_KEY, "{}"),
            self.store.get_value(DEFAULT_PREFS_KEY, "{}"),
        );
        let user = decode_map(USER_PREFS_KEY, &user_blob?)?;
        let defaults = decode_map(DEFAULT_PREFS_KEY, &default_blob?)?;
        debug!(
            store = self.store.store_name(),
            overrides = user.len(),
            defaults = defaults.len(),
            "layered preference store loaded"
        );
        *self.maps.lock().unwrap() = Some(PrefMaps { user, defaults });
        Ok(())
    }

    /// Resolves `id` override-then-default, purely in memory.
    pub fn get_value(&self, id: &str) -> PrefResult<Option<Value>> {
        let guard = self.maps.lock().unwrap();
        let maps = guard.as_ref().ok_or(PrefError::NotReady)?;
        Ok(maps
            .user
            .get(id)
            .or_else(|| maps.defaults.get(id))
            .cloned())
    }

    /// Like [`get_value`](Self::get_value) but with a caller-supplied
    /// fallback when neither layer has the id.
    pub fn get_value_or(&self, id: &str, default: Value) -> PrefResult<Value> {
        Ok(self.get_value(id)?.unwrap_or(default))
    }

    /// Sets the override for `id`.
    ///
    /// The override map is mutated and the [`JsonChangeEvent`] fires
    /// immediately on acceptance; the re-serialized blob is then forwarded
    /// to the underlying store as one write, whose durability scheduling is
    /// the underlying store's business.
    pub async fn set_value(&self, id: &str, value: Value) -> PrefResult<()> {
        let blob = {
            let mut guard = self.maps.lock().unwrap();
            let maps = guard.as_mut().ok_or(PrefError::NotReady)?;
            maps.user.insert(id.to_string(), value.clone());
            let blob = serde_json::to_string(&maps.user)?;
            let _ = self.events.send(JsonChangeEvent {
                key: id.to_string(),
                new_value: Some(value),
            });
            blob
        };
        self.store.set_value(USER_PREFS_KEY, Some(&blob)).await?;
        Ok(())
    }

    /// Deletes the listed ids from the override map and persists the blob.
    pub async fn remove_value(&self, ids: &[String]) -> PrefResult<()> {
        let blob = {
            let mut guard = self.maps.lock().unwrap();
            let maps = guard.as_mut().ok_or(PrefError::NotReady)?;
            for id in ids {
                if maps.user.remove(id).is_some() {
                    let _ = self.events.send(JsonChangeEvent {
                        key: id.clone(),
                        new_value: None,
                    });
                }
            }
            serde_json::to_string(&maps.user)?
        };
        self.store.set_value(USER_PREFS_KEY, Some(&blob)).await?;
        Ok(())
    }

    /// Empties the override map and persists an empty blob. Defaults are
    /// untouched.
    pub async fn clear(&self) -> PrefResult<()> {
        {
            let mut guard = self.maps.lock().unwrap();
            let maps = guard.as_mut().ok_or(PrefError::NotReady)?;
            let ids: Vec<String> = maps.user.keys().cloned().collect();
            for id in ids {
                let _ = self.events.send(JsonChangeEvent {
                    key: id,
                    new_value: None,
                });
            }
            maps.user.clear();
        }
        self.store.set_value(USER_PREFS_KEY, Some("{}")).await?;
        Ok(())
    }

    /// Forces the underlying store to persist now.
    pub async fn flush(&self) -> PrefResult<()> {
        self.store.flush().await
    }

    /// Mirrors the underlying store's dirty state.
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Opens a subscription to per-id typed change events.
    pub fn subscribe(&self) -> broadcast::Receiver<JsonChangeEvent> {
        self.events.subscribe()
    }
}

fn decode_map(key: &str, blob: &str) -> PrefResult<HashMap<String, Value>> {
    serde_json::from_str(blob).map_err(|e| PrefError::decode(key, e.to_string()))
}
