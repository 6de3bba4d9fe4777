//! Write-back caching implementation of the prefstore contract.
//!
//! [`WritebackCacheStore`] sits in front of a slow asynchronous
//! [`BackingStore`](prefstore_core::BackingStore). Writes are accepted into
//! an in-memory pending set immediately (and the change event fires at that
//! moment); persistence is deferred to a single debounced timer that hands
//! the whole pending snapshot to the backing store's bulk-set operation.
//! Removals and clears go the other way round: the backing store is updated
//! first and the local mirrors only afterwards, so the source of truth never
//! lags behind the cache on deletions.
//!
//! Requires a tokio runtime: the debounce timer and the external-change
//! listener are spawned tasks owned by the store and aborted on drop.

mod cache;
mod config;

pub use cache::WritebackCacheStore;
pub use config::WritebackConfig;
