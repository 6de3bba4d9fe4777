//! Layered JSON preference layer over a [`PreferenceStore`](prefstore_core::PreferenceStore).
//!
//! [`LayeredJsonStore`] keeps two string-keyed maps of arbitrary JSON
//! values — user overrides and read-only defaults — each persisted as a
//! single JSON blob under a reserved key of the underlying store. Reads
//! resolve override-then-default entirely in memory; every write
//! re-serializes the whole override map into one blob write.
//!
//! [`TypedPreference`] binds one preference id to a serde type, pushing all
//! typed decoding to the edge of the system.

mod layered;
mod typed;

pub use layered::{JsonChangeEvent, LayeredJsonStore, DEFAULT_PREFS_KEY, USER_PREFS_KEY};
pub use typed::TypedPreference;
