//! The write-back cache store.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use prefstore_core::{
    AreaChange, BackingStore, BoxFuture, ChangeEvent, ChangeNotifier, PrefResult, PreferenceStore,
};

use crate::config::WritebackConfig;

/// Write-back caching [`PreferenceStore`] over a [`BackingStore`].
///
/// Writes are accepted into the pending set immediately; the first write
/// after the cache becomes clean arms a single debounce timer, and when it
/// fires the whole pending snapshot is handed to the backing store as one
/// bulk set. Reads resolve pending-write → read cache → backing store, so a
/// key with a pending write can never be answered with a stale backing
/// value.
///
/// Construction requires a running tokio runtime: the store owns the
/// debounce timer task and a listener task for the backing store's external
/// change notifications, both aborted when the store is dropped.
pub struct WritebackCacheStore {
    backing: Arc<dyn BackingStore>,
    config: WritebackConfig,
    state: Mutex<CacheState>,
    /// Serializes flushes so an explicit `flush()` and a timer-driven one
    /// never run their backing writes concurrently.
    flush_gate: AsyncMutex<()>,
    notifier: ChangeNotifier,
    /// Handle back to ourselves for the timer task.
    weak: Weak<WritebackCacheStore>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct CacheState {
    /// Writes accepted but not yet handed to the backing store.
    /// Last-writer-wins per key within the debounce window.
    pending: HashMap<String, String>,
    /// Values previously fetched from (or flushed to) the backing store.
    read_cache: HashMap<String, String>,
    /// Armed debounce timer, if any.
    timer: Option<JoinHandle<()>>,
}

impl WritebackCacheStore {
    /// Creates a store over `backing` and spawns its external-change
    /// listener.
    pub fn new(backing: Arc<dyn BackingStore>, config: WritebackConfig) -> Arc<Self> {
        let mut rx = backing.changes();
        let store = Arc::new_cyclic(|weak| Self {
            backing,
            notifier: ChangeNotifier::new(config.event_capacity),
            config,
            state: Mutex::new(CacheState::default()),
            flush_gate: AsyncMutex::new(()),
            weak: weak.clone(),
            listener: Mutex::new(None),
        });

        let weak = Arc::downgrade(&store);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        let Some(store) = weak.upgrade() else { break };
                        store.apply_external_change(change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "external change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *store.listener.lock().unwrap() = Some(handle);

        store
    }

    async fn get(&self, key: &str, default: &str) -> PrefResult<String> {
        {
            let state = self.state.lock().unwrap();
            if let Some(v) = state.pending.get(key) {
                return Ok(v.clone());
            }
            if let Some(v) = state.read_cache.get(key) {
                return Ok(v.clone());
            }
        }

        let keys = [key.to_string()];
        let mut fetched = self.backing.get(&keys).await?;
        match fetched.remove(key) {
            Some(v) => {
                let mut state = self.state.lock().unwrap();
                // A write accepted while the fetch was in flight wins.
                if let Some(pending) = state.pending.get(key) {
                    return Ok(pending.clone());
                }
                state.read_cache.insert(key.to_string(), v.clone());
                Ok(v)
            }
            None => {
                let state = self.state.lock().unwrap();
                if let Some(pending) = state.pending.get(key) {
                    return Ok(pending.clone());
                }
                Ok(default.to_string())
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> PrefResult<Option<String>> {
        let arm = {
            let mut state = self.state.lock().unwrap();
            state.pending.insert(key.to_string(), value.to_string());
            self.notifier.emit(ChangeEvent {
                store: self.config.area.clone(),
                key: key.to_string(),
                new_value: Some(value.to_string()),
            });
            state.timer.is_none()
        };
        if arm {
            self.arm_timer();
        }
        Ok(Some(value.to_string()))
    }

    /// Arms the debounce timer unless one is already armed. Writes that
    /// land while a timer is armed do not restart it, so write latency is
    /// bounded by one debounce interval.
    fn arm_timer(&self) {
        let mut state = self.state.lock().unwrap();
        if state.timer.is_some() {
            return;
        }
        let weak = self.weak.clone();
        let debounce = self.config.debounce;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(store) = weak.upgrade() else { return };
            // Clear the handle before flushing: flush_now aborts whatever
            // timer is still armed, and this task must not abort itself
            // mid-flush.
            store.clear_timer();
            if let Err(err) = store.flush_now().await {
                warn!(area = %store.config.area, error = %err, "debounced flush failed");
            }
        }));
    }

    fn clear_timer(&self) {
        self.state.lock().unwrap().timer.take();
    }

    /// Flushes the pending set to the backing store.
    ///
    /// The snapshot is drained out of the pending set at hand-off; if the
    /// backing write fails, entries are returned for retry on the next
    /// flush cycle, except where a newer pending write for the same key has
    /// superseded them.
    async fn flush_now(&self) -> PrefResult<()> {
        let _gate = self.flush_gate.lock().await;

        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            if state.pending.is_empty() {
                return Ok(());
            }
            mem::take(&mut state.pending)
        };

        let keys: Vec<&String> = snapshot.keys().collect();
        debug!(area = %self.config.area, ?keys, "flushing pending writes");

        match self.backing.set(snapshot.clone()).await {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                for (key, value) in snapshot {
                    // A write accepted during the backing call stays
                    // pending; only settled values move to the read cache.
                    if !state.pending.contains_key(&key) {
                        state.read_cache.insert(key, value);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(area = %self.config.area, error = %err, "backing store rejected flush; re-queueing entries");
                let mut state = self.state.lock().unwrap();
                for (key, value) in snapshot {
                    state.pending.entry(key).or_insert(value);
                }
                Err(err)
            }
        }
    }

    /// Removes keys source-of-truth-first: the backing store is updated
    /// before the local mirrors, so a crash in between never leaves the
    /// cache believing a key is gone while the backing store still has it.
    /// On backing failure the local state is untouched.
    async fn remove_keys(&self, keys: &[String]) -> PrefResult<()> {
        // Order after any in-flight flush: a removal racing a slow bulk
        // set must still converge to "removed", never to the flushed value.
        let _gate = self.flush_gate.lock().await;
        self.backing.remove(keys).await?;
        let mut state = self.state.lock().unwrap();
        for key in keys {
            state.pending.remove(key);
            state.read_cache.remove(key);
            self.notifier.emit(ChangeEvent {
                store: self.config.area.clone(),
                key: key.clone(),
                new_value: None,
            });
        }
        Ok(())
    }

    /// Clears everything, source-of-truth-first and ordered after any
    /// in-flight flush. Removal events fire for the locally known keys
    /// (pending and read cache); keys only the backing store knows about
    /// are reported through its own change channel.
    async fn clear_all(&self) -> PrefResult<()> {
        let _gate = self.flush_gate.lock().await;
        self.backing.clear().await?;
        let mut state = self.state.lock().unwrap();
        let mut keys: Vec<String> = state.pending.keys().cloned().collect();
        keys.extend(state.read_cache.keys().cloned());
        keys.sort();
        keys.dedup();
        state.pending.clear();
        state.read_cache.clear();
        for key in keys {
            self.notifier.emit(ChangeEvent {
                store: self.config.area.clone(),
                key,
                new_value: None,
            });
        }
        Ok(())
    }

    /// Handles a change reported by the backing store on behalf of another
    /// writer sharing the same storage area.
    ///
    /// The cached entry is invalidated, not overwritten — the next read
    /// re-queries the backing store — unless a pending local write exists,
    /// which wins. The change is republished either way.
    fn apply_external_change(&self, change: AreaChange) {
        if change.area != self.config.area {
            return;
        }
        let mut state = self.state.lock().unwrap();
        for (key, changed) in change.changes {
            if !state.pending.contains_key(&key) {
                state.read_cache.remove(&key);
            }
            self.notifier.emit(ChangeEvent {
                store: self.config.area.clone(),
                key,
                new_value: changed.new_value,
            });
        }
    }
}

impl PreferenceStore for WritebackCacheStore {
    fn get_value<'a>(&'a self, key: &'a str, default: &'a str) -> BoxFuture<'a, PrefResult<String>> {
        Box::pin(self.get(key, default))
    }

    fn set_value<'a>(
        &'a self,
        key: &'a str,
        value: Option<&'a str>,
    ) -> BoxFuture<'a, PrefResult<Option<String>>> {
        match value {
            Some(v) => {
                let accepted = self.set(key, v);
                Box::pin(async move { accepted })
            }
            // Null means "remove this key", never "store empty string".
            None => Box::pin(async move {
                let keys = [key.to_string()];
                self.remove_keys(&keys).await?;
                Ok(None)
            }),
        }
    }

    fn remove_value<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, PrefResult<()>> {
        Box::pin(self.remove_keys(keys))
    }

    fn clear(&self) -> BoxFuture<'_, PrefResult<()>> {
        Box::pin(self.clear_all())
    }

    fn flush(&self) -> BoxFuture<'_, PrefResult<()>> {
        Box::pin(self.flush_now())
    }

    fn is_dirty(&self) -> bool {
        !self.state.lock().unwrap().pending.is_empty()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    fn store_name(&self) -> &str {
        &self.config.area
    }
}

impl Drop for WritebackCacheStore {
    fn drop(&mut self) {
        if let Some(timer) = self.state.lock().unwrap().timer.take() {
            timer.abort();
        }
        if let Some(listener) = self.listener.lock().unwrap().take() {
            listener.abort();
        }
    }
}
