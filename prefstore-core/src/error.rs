//! Error types shared across the prefstore crates.

use thiserror::Error;

/// Result alias used throughout the prefstore crates.
pub type PrefResult<T> = Result<T, PrefError>;

/// Errors that can occur during preference-store operations.
#[derive(Debug, Error)]
pub enum PrefError {
    /// A read or write was attempted on a layered store before its initial
    /// load completed. Callers are required to await readiness once at
    /// startup; this error is surfaced loudly rather than silently
    /// substituting a default.
    #[error("preference store is not ready (await ready() first)")]
    NotReady,

    /// The underlying backing store rejected an operation.
    #[error("backing store {operation} failed: {reason}")]
    Backing {
        /// Which backing operation failed (`"get"`, `"set"`, `"remove"`,
        /// `"clear"`).
        operation: &'static str,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A stored value could not be decoded into its expected shape.
    ///
    /// For the layered JSON store this means a persisted blob is malformed;
    /// the store refuses to become ready rather than masking possible data
    /// loss with an empty map.
    #[error("failed to decode stored value under {key:?}: {reason}")]
    Decode { key: String, reason: String },

    /// JSON serialization failed while preparing a value for persistence.
    #[error("JSON serialization failed: {0}")]
    Serialization(String),
}

impl PrefError {
    /// Shorthand for a [`PrefError::Backing`] with an owned reason.
    pub fn backing(operation: &'static str, reason: impl Into<String>) -> Self {
        PrefError::Backing {
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`PrefError::Decode`] with owned fields.
    pub fn decode(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PrefError::Decode {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PrefError {
    fn from(e: serde_json::Error) -> Self {
        PrefError::Serialization(e.to_string())
    }
}
