//! # Callstate
//!
//! Call-state tracking for fine-grained reactive stores.
//!
//! A collection's call state is one of `init`, `loading`, `loaded` or
//! `error(message)`. This crate provides three layers:
//!
//! ## Signals (Low-level primitives)
//!
//! - `Signal<T>` - Reactive values that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Effect` - Side effects that run when dependencies change
//!
//! ## Store (Composition)
//!
//! - `SignalStore` - Keyed state assembled from `StoreFeature`s
//! - `StatePatch` - Partial updates merged into the store key by key
//!
//! ## Call state
//!
//! - `with_call_state` / `with_named_call_state` - the store feature
//! - `set_loading`, `set_loaded`, `set_error` - transition patches
//! - `call_state_keys` - the key naming shared by both

pub mod call_state;
pub mod error;
pub mod runtime;
pub mod signal;
pub mod store;

// Re-export main types for convenience
pub use call_state::{
    call_state_keys, set_error, set_loaded, set_loading, with_call_state, with_named_call_state,
    CallState, CallStateFeature, CallStateKeys, CallStateSignals, ErrorMessage,
};
pub use error::StoreError;
pub use signal::{create_effect, create_memo, Effect, Memo, ReadSignal, Signal};
pub use store::{SignalStore, StatePatch, StoreFeature};
