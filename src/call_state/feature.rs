use crate::call_state::keys::{call_state_keys, CallStateKeys};
use crate::call_state::status::CallState;
use crate::error::StoreError;
use crate::signal::{Memo, ReadSignal};
use crate::store::{ComputedSlice, SignalStore, StateSignals, StateSlice, StoreFeature};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Store feature tracking the call state of one or more collections.
///
/// Built with [`with_call_state`] (the default, unnamed collection) or
/// [`with_named_call_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStateFeature {
    collections: Vec<String>,
}

/// Call state for the default collection: `callState`, `loading`, `loaded`,
/// `error`.
pub fn with_call_state() -> CallStateFeature {
    CallStateFeature {
        collections: vec![String::new()],
    }
}

/// Call state for each named collection, in order.
///
/// An empty name stands for the default collection and an empty sequence
/// configures no collections at all. If a name appears twice the later entry
/// replaces the earlier one.
pub fn with_named_call_state<I, S>(collections: I) -> CallStateFeature
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let collections: Vec<String> = collections.into_iter().map(Into::into).collect();

    let mut seen = HashSet::new();
    for collection in &collections {
        if !seen.insert(collection.as_str()) {
            tracing::warn!(%collection, "collection configured twice; later entry wins");
        }
    }

    CallStateFeature { collections }
}

impl CallStateFeature {
    /// Configured collection names, `""` being the default collection.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Every status key set to `Init`.
    pub fn initial_state(&self) -> BTreeMap<String, CallState> {
        self.collections
            .iter()
            .fold(BTreeMap::new(), |mut state, collection| {
                state.insert(call_state_keys(Some(collection.as_str())).status, CallState::Init);
                state
            })
    }

    /// Derived signals for every collection, keyed by collection name.
    pub fn derived_signals(
        &self,
        state: &StateSignals,
    ) -> Result<BTreeMap<String, CallStateSignals>, StoreError> {
        self.collections
            .iter()
            .try_fold(BTreeMap::new(), |mut signals, collection| {
                let keys = call_state_keys(Some(collection.as_str()));
                let status = state.get(&keys.status)?;
                signals.insert(collection.clone(), CallStateSignals::new(status, keys));
                Ok::<_, StoreError>(signals)
            })
    }
}

impl StoreFeature for CallStateFeature {
    fn name(&self) -> &str {
        "call_state"
    }

    fn initial_state(&self) -> StateSlice {
        CallStateFeature::initial_state(self)
            .into_iter()
            .map(|(key, state)| (key, Value::from(state)))
            .collect()
    }

    fn computed(&self, state: &StateSignals) -> Result<ComputedSlice, StoreError> {
        let mut slice = ComputedSlice::new();
        for signals in self.derived_signals(state)?.into_values() {
            let CallStateSignals {
                keys,
                loading,
                loaded,
                error,
            } = signals;
            slice.insert(keys.loading, loading);
            slice.insert(keys.loaded, loaded);
            slice.insert(keys.error, error);
        }
        Ok(slice)
    }
}

/// Read-only signals derived from one collection's status.
#[derive(Clone)]
pub struct CallStateSignals {
    pub keys: CallStateKeys,
    pub loading: Memo<bool>,
    pub loaded: Memo<bool>,
    pub error: Memo<Option<String>>,
}

impl CallStateSignals {
    /// Derive the three signals from a status signal.
    pub fn new(status: ReadSignal<Value>, keys: CallStateKeys) -> Self {
        let loading = {
            let status = status.clone();
            Memo::new(move || decode(&status).is_some_and(|state| state.is_loading()))
        };
        let loaded = {
            let status = status.clone();
            Memo::new(move || decode(&status).is_some_and(|state| state.is_loaded()))
        };
        let error = Memo::new(move || match decode(&status) {
            Some(CallState::Error(message)) => Some(message),
            _ => None,
        });

        Self {
            keys,
            loading,
            loaded,
            error,
        }
    }

    /// Look up the signals a call-state feature registered in `store`.
    pub fn from_store(store: &SignalStore, collection: Option<&str>) -> Result<Self, StoreError> {
        let keys = call_state_keys(collection);
        Ok(Self {
            loading: store.computed(&keys.loading)?,
            loaded: store.computed(&keys.loaded)?,
            error: store.computed(&keys.error)?,
            keys,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn error(&self) -> Option<String> {
        self.error.get()
    }
}

fn decode(status: &ReadSignal<Value>) -> Option<CallState> {
    status.with(|value| {
        let state = CallState::from_value(value);
        if state.is_none() {
            tracing::warn!(%value, "state value is not a call state");
        }
        state
    })
}

impl SignalStore {
    /// Call-state signals for a collection configured in this store.
    pub fn call_state(&self, collection: Option<&str>) -> Result<CallStateSignals, StoreError> {
        CallStateSignals::from_store(self, collection)
    }
}
