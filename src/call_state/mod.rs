//! Call-state tracking for store collections.
//!
//! Every configured collection gets a status key holding a [`CallState`] and
//! three derived signals:
//!
//! | collection | status            | derived                                       |
//! |------------|-------------------|-----------------------------------------------|
//! | default    | `callState`       | `loading`, `loaded`, `error`                  |
//! | `flight`   | `flightCallState` | `flightLoading`, `flightLoaded`, `flightError` |
//!
//! Transitions are plain [`StatePatch`](crate::StatePatch)es built by
//! [`set_loading`], [`set_loaded`] and [`set_error`] and applied with
//! [`SignalStore::patch_state`](crate::SignalStore::patch_state).
//!
//! ```
//! use callstate::{set_loaded, with_named_call_state, SignalStore};
//!
//! let store = SignalStore::builder()
//!     .with_feature(with_named_call_state(["flight", "hotel"]))
//!     .build()?;
//!
//! store.patch_state(set_loaded(Some("flight")));
//! assert!(store.call_state(Some("flight"))?.is_loaded());
//! assert!(!store.call_state(Some("hotel"))?.is_loaded());
//! # Ok::<(), callstate::StoreError>(())
//! ```

mod feature;
mod keys;
mod patch;
mod status;

pub use feature::{with_call_state, with_named_call_state, CallStateFeature, CallStateSignals};
pub use keys::{call_state_keys, CallStateKeys};
pub use patch::{set_error, set_loaded, set_loading, ErrorMessage};
pub use status::CallState;
