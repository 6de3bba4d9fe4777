//! Contract of the slow asynchronous key/value store behind a cache.
//!
//! The backing store is an external collaborator (browser storage areas,
//! a remote settings service, an on-disk database, …). This crate only
//! *consumes* the trait; concrete implementations live with the embedding
//! application, and test mocks live in the test files that need them.

use std::collections::HashMap;

use tokio::sync::broadcast;

use crate::store::BoxFuture;
use crate::PrefResult;

/// The new value reported for one key in an [`AreaChange`].
///
/// `new_value: None` means the key was removed by the external writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedValue {
    pub new_value: Option<String>,
}

/// A change notification from the backing store.
///
/// The backing store may be shared between several writers (e.g. another
/// process using the same storage area); it reports every change together
/// with the logical area it happened in. Consumers filter by `area` against
/// their own configured area name (e.g. `"local"` vs `"sync"`).
#[derive(Debug, Clone)]
pub struct AreaChange {
    /// Logical storage area the change happened in.
    pub area: String,
    /// Changed keys with their new values.
    pub changes: HashMap<String, ChangedValue>,
}

/// Asynchronous bulk key/value store with its own change-notification
/// channel.
///
/// Every operation returns eventually and may fail with
/// [`PrefError::Backing`](crate::PrefError::Backing).
pub trait BackingStore: Send + Sync {
    /// Fetches the listed keys. Missing keys are simply absent from the
    /// returned map.
    fn get<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, PrefResult<HashMap<String, String>>>;

    /// Durably stores every entry in `entries` (bulk set).
    fn set(&self, entries: HashMap<String, String>) -> BoxFuture<'_, PrefResult<()>>;

    /// Durably removes the listed keys.
    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, PrefResult<()>>;

    /// Durably removes all keys.
    fn clear(&self) -> BoxFuture<'_, PrefResult<()>>;

    /// Subscribes to change notifications for all areas this backing store
    /// serves. Consumers are expected to filter by [`AreaChange::area`].
    fn changes(&self) -> broadcast::Receiver<AreaChange>;
}
