//! Typed accessor bound to a single preference id.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use prefstore_core::{PrefError, PrefResult};

use crate::layered::LayeredJsonStore;

/// A thin typed handle for one preference id in a [`LayeredJsonStore`].
///
/// Owns no state beyond the id and the store reference, so it always
/// reflects the current override/default maps. A stored value whose shape
/// does not match `T` surfaces as [`PrefError::Decode`] at read time rather
/// than being coerced.
pub struct TypedPreference<T> {
    store: Arc<LayeredJsonStore>,
    id: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedPreference<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<LayeredJsonStore>, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
            _marker: PhantomData,
        }
    }

    /// The preference id this accessor is bound to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads and decodes the current value, `Ok(None)` if neither layer has
    /// it.
    pub fn get(&self) -> PrefResult<Option<T>> {
        match self.store.get_value(&self.id)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| PrefError::decode(&self.id, e.to_string())),
            None => Ok(None),
        }
    }

    /// Reads the current value, falling back to `default` when neither
    /// layer has the id. Decode mismatches still surface as errors.
    pub fn get_or(&self, default: T) -> PrefResult<T> {
        Ok(self.get()?.unwrap_or(default))
    }

    /// Encodes and stores `value` as the override for this id.
    pub async fn set(&self, value: &T) -> PrefResult<()> {
        let json = serde_json::to_value(value)?;
        self.store.set_value(&self.id, json).await
    }
}
