//! Composable keyed state stores.
//!
//! A [`SignalStore`] is assembled from features. Each feature contributes a
//! state slice and the computed signals it derives from that state; the store
//! keeps one signal per state key and applies [`StatePatch`]es by merging them
//! key by key.

mod feature;
mod patch;
mod store;

pub use feature::{ComputedSignal, ComputedSlice, StateSignals, StateSlice, StoreFeature};
pub use patch::StatePatch;
pub use store::{SignalStore, SignalStoreBuilder, StateSnapshot};
