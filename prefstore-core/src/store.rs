//! The abstract preference-store contract.

use core::future::Future;
use core::pin::Pin;

use tokio::sync::broadcast;

use crate::event::ChangeEvent;
use crate::PrefResult;

/// Type alias for dyn-safe async trait methods (no `async_trait`), matching
/// the convention used across the prefstore crates.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A persistent key/value preference store with change notification.
///
/// All operations are asynchronous: they may suspend the calling task until
/// a backing operation resolves, but they never block the caller thread, and
/// concurrent callers of the same store never block each other on the
/// store's internal state.
///
/// Implementations in this workspace:
///
/// - [`InMemoryStore`](crate::InMemoryStore) — pure in-memory, futures
///   resolve immediately
/// - `WritebackCacheStore` (prefstore-writeback) — write-back cache over a
///   [`BackingStore`](crate::BackingStore) with debounced flush
pub trait PreferenceStore: Send + Sync {
    /// Reads the value for `key`, returning `default` on a miss.
    ///
    /// Never fails on a miss; resolves once any needed backing fetch
    /// completes.
    fn get_value<'a>(&'a self, key: &'a str, default: &'a str) -> BoxFuture<'a, PrefResult<String>>;

    /// Accepts a write for `key`.
    ///
    /// `Some(v)` stores `v` and returns the accepted value once durability
    /// is *scheduled* (not necessarily completed). `None` means "remove this
    /// key", never "store empty string", and returns `Ok(None)`.
    ///
    /// The corresponding [`ChangeEvent`] is emitted synchronously at
    /// acceptance, before any backing write resolves.
    fn set_value<'a>(
        &'a self,
        key: &'a str,
        value: Option<&'a str>,
    ) -> BoxFuture<'a, PrefResult<Option<String>>>;

    /// Removes every listed key; resolves once backing-store removal is
    /// acknowledged.
    fn remove_value<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, PrefResult<()>>;

    /// Removes all keys; resolves once the backing-store clear is
    /// acknowledged.
    ///
    /// Emits a removal event for every key the implementation knows about.
    /// An in-memory store knows them all; a caching store may only know
    /// its pending and cached entries, and relies on the backing store's
    /// own change channel to report the rest.
    fn clear(&self) -> BoxFuture<'_, PrefResult<()>>;

    /// Forces any pending writes to the backing store now.
    fn flush(&self) -> BoxFuture<'_, PrefResult<()>>;

    /// Whether unflushed writes exist. Synchronous.
    fn is_dirty(&self) -> bool;

    /// Opens a subscription to this store's change events.
    ///
    /// Every accepted write (local or republished from an external origin)
    /// produces exactly one event, in acceptance order.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Identity of this store, used as the `store` field of emitted events.
    fn store_name(&self) -> &str;
}
