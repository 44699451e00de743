use crate::error::StoreError;
use crate::signal::{Memo, ReadSignal};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Initial state contributed by a feature, keyed by state key.
pub type StateSlice = BTreeMap<String, Value>;

/// A building block of a [`SignalStore`](crate::SignalStore).
///
/// The store builder installs every feature's state first, then asks the
/// feature for the computed signals it derives from the live state.
pub trait StoreFeature: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn initial_state(&self) -> StateSlice;

    fn computed(&self, _state: &StateSignals) -> Result<ComputedSlice, StoreError> {
        Ok(ComputedSlice::new())
    }
}

/// Read-only access to the store's state signals during assembly.
#[derive(Clone, Default)]
pub struct StateSignals {
    signals: BTreeMap<String, ReadSignal<Value>>,
}

impl StateSignals {
    pub(crate) fn new(signals: BTreeMap<String, ReadSignal<Value>>) -> Self {
        Self { signals }
    }

    /// The signal for `key`, or `UnknownStateKey`.
    pub fn get(&self, key: &str) -> Result<ReadSignal<Value>, StoreError> {
        self.signals
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownStateKey {
                key: key.to_string(),
            })
    }
}

/// A computed signal stored under a string key.
///
/// Implemented for every `Memo<T>` whose value is serializable, so the store
/// can hand it out either typed or as JSON.
pub trait ComputedSignal: Send + Sync {
    fn value(&self) -> Result<Value, serde_json::Error>;

    fn value_type(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl<T> ComputedSignal for Memo<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    fn value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.get())
    }

    fn value_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Computed signals contributed by a feature, keyed by computed key.
#[derive(Clone, Default)]
pub struct ComputedSlice {
    entries: BTreeMap<String, Arc<dyn ComputedSignal>>,
}

impl ComputedSlice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `memo` under `key`, replacing any earlier entry.
    pub fn insert<T>(&mut self, key: impl Into<String>, memo: Memo<T>)
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        self.entries.insert(key.into(), Arc::new(memo));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ComputedSlice {
    type Item = (String, Arc<dyn ComputedSignal>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Arc<dyn ComputedSignal>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A feature holding a single plain state key.
pub(crate) struct StateEntry {
    pub(crate) key: String,
    pub(crate) value: Value,
}

impl StoreFeature for StateEntry {
    fn name(&self) -> &str {
        &self.key
    }

    fn initial_state(&self) -> StateSlice {
        StateSlice::from([(self.key.clone(), self.value.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ReactiveRuntime;
    use crate::signal::Signal;

    #[test]
    fn memo_as_computed_signal() {
        ReactiveRuntime::scope(|| {
            let source = Signal::new(2);
            let memo = Memo::new({
                let source = source.clone();
                move || source.get() > 1
            });

            let computed: Arc<dyn ComputedSignal> = Arc::new(memo);
            assert_eq!(computed.value().ok(), Some(Value::Bool(true)));
            assert_eq!(computed.value_type(), "bool");
            assert!(computed.as_any().downcast_ref::<Memo<bool>>().is_some());
        });
    }

    #[test]
    fn missing_state_key_is_reported() {
        let signals = StateSignals::default();
        let err = signals.get("callState").err();
        assert!(matches!(
            err,
            Some(StoreError::UnknownStateKey { key }) if key == "callState"
        ));
    }
}
