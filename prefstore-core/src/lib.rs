//! Core contracts for the prefstore preference-persistence layer.
//!
//! This crate defines the abstract surface the rest of the workspace builds
//! on:
//!
//! - [`PreferenceStore`] — the async key/value preference contract with
//!   change notification
//! - [`BackingStore`] — the contract of the slow, durable store a caching
//!   implementation sits in front of (consumed, never implemented here)
//! - [`PrefError`] / [`PrefResult`] — the shared error taxonomy
//! - [`InMemoryStore`] — a pure in-memory reference implementation, the
//!   default for ephemeral consumers and a test double for everything else
//!
//! Concrete caching implementations live in sibling crates
//! (`prefstore-writeback`), as does the layered JSON preference layer
//! (`prefstore-json`).

pub mod backing;
pub mod error;
pub mod event;
pub mod memory;
pub mod store;

// Public API exports
pub use backing::{AreaChange, BackingStore, ChangedValue};
pub use error::{PrefError, PrefResult};
pub use event::{ChangeEvent, ChangeNotifier, DEFAULT_EVENT_CAPACITY};
pub use memory::InMemoryStore;
pub use store::{BoxFuture, PreferenceStore};
