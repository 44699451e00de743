//! Error types for store assembly and state access.
//!
//! Call-state transitions never fail: a failed operation is recorded as
//! `CallState::Error(message)` in the store. `StoreError` only covers misuse
//! of the store itself (colliding keys, unknown keys, wrong types).

use thiserror::Error;

/// Errors raised while assembling or reading a [`SignalStore`](crate::SignalStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Two features tried to install the same state key.
    #[error("state key `{key}` is defined by more than one feature")]
    DuplicateStateKey { key: String },

    /// A computed key collides with a state key or another computed key.
    #[error("computed key `{key}` is already defined in the store")]
    DuplicateComputedKey { key: String },

    /// A feature or caller referenced a state key the store does not hold.
    #[error("unknown state key `{key}`")]
    UnknownStateKey { key: String },

    /// No computed signal is registered under the key.
    #[error("unknown computed key `{key}`")]
    UnknownComputedKey { key: String },

    /// The computed signal exists but holds a different value type.
    #[error("computed key `{key}` holds `{found}`, not `{expected}`")]
    ComputedTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A state value could not be decoded into the requested type.
    #[error("state key `{key}` could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A computed value could not be encoded as JSON.
    #[error("computed key `{key}` could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// The store key the error is about.
    pub fn key(&self) -> &str {
        match self {
            StoreError::DuplicateStateKey { key }
            | StoreError::DuplicateComputedKey { key }
            | StoreError::UnknownStateKey { key }
            | StoreError::UnknownComputedKey { key }
            | StoreError::ComputedTypeMismatch { key, .. }
            | StoreError::Decode { key, .. }
            | StoreError::Encode { key, .. } => key,
        }
    }
}
