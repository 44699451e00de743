use crate::error::StoreError;
use crate::runtime::ReactiveRuntime;
use crate::signal::{Memo, ReadSignal, Signal};
use crate::store::feature::{ComputedSignal, StateEntry, StateSignals, StoreFeature};
use crate::store::patch::StatePatch;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Plain copy of every state key and its current value.
pub type StateSnapshot = BTreeMap<String, Value>;

type Subscriber = Arc<dyn Fn(&StateSnapshot) + Send + Sync>;

/// A keyed reactive store assembled from features.
///
/// Each state key is backed by its own signal, so computed values only
/// recompute when the keys they read change. State is changed exclusively
/// through [`SignalStore::patch_state`].
pub struct SignalStore {
    state: Arc<RwLock<BTreeMap<String, Signal<Value>>>>,
    computed: Arc<BTreeMap<String, Arc<dyn ComputedSignal>>>,
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    runtime: Arc<ReactiveRuntime>,
}

impl SignalStore {
    /// Start assembling a store in the current runtime.
    pub fn builder() -> SignalStoreBuilder {
        SignalStoreBuilder::new()
    }

    fn state_map(&self) -> RwLockReadGuard<'_, BTreeMap<String, Signal<Value>>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_map_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Signal<Value>>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shallow-merge `patch` into the state.
    ///
    /// Keys already present are written through their signals; new keys are
    /// added. The writes form one batch: effects reading any patched key run
    /// once, after every key has been written, and subscribers run after them.
    pub fn patch_state(&self, patch: impl Into<StatePatch>) {
        let patch = patch.into();
        if patch.is_empty() {
            return;
        }
        tracing::debug!(keys = ?patch.keys().collect::<Vec<_>>(), "applying state patch");

        ReactiveRuntime::batch(|| {
            for (key, value) in patch {
                // Clone the signal out so the map lock is never held across a write
                let existing = self.state_map().get(&key).cloned();
                match existing {
                    Some(signal) => signal.set(value),
                    None => {
                        tracing::debug!(%key, "patch adds new state key");
                        let signal = Signal::new_in(Arc::clone(&self.runtime), value);
                        self.state_map_mut().insert(key, signal);
                    }
                }
            }
        });

        self.notify();
    }

    /// Current JSON value of a state key.
    pub fn state_value(&self, key: &str) -> Result<Value, StoreError> {
        self.state_signal(key).map(|signal| signal.get())
    }

    /// Current value of a state key decoded as `T`.
    pub fn state<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        serde_json::from_value(self.state_value(key)?).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
    }

    /// Read-only signal backing a state key.
    pub fn state_signal(&self, key: &str) -> Result<ReadSignal<Value>, StoreError> {
        self.state_map()
            .get(key)
            .map(Signal::read_only)
            .ok_or_else(|| StoreError::UnknownStateKey {
                key: key.to_string(),
            })
    }

    /// Copy of the whole state. Reads are not tracked.
    pub fn snapshot(&self) -> StateSnapshot {
        self.state_map()
            .iter()
            .map(|(key, signal)| (key.clone(), signal.peek()))
            .collect()
    }

    pub fn state_keys(&self) -> Vec<String> {
        self.state_map().keys().cloned().collect()
    }

    pub fn computed_keys(&self) -> Vec<String> {
        self.computed.keys().cloned().collect()
    }

    fn computed_entry(&self, key: &str) -> Result<&Arc<dyn ComputedSignal>, StoreError> {
        self.computed
            .get(key)
            .ok_or_else(|| StoreError::UnknownComputedKey {
                key: key.to_string(),
            })
    }

    /// Current value of a computed key as JSON.
    pub fn computed_value(&self, key: &str) -> Result<Value, StoreError> {
        self.computed_entry(key)?
            .value()
            .map_err(|source| StoreError::Encode {
                key: key.to_string(),
                source,
            })
    }

    /// The typed memo registered under a computed key.
    pub fn computed<T>(&self, key: &str) -> Result<Memo<T>, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.computed_entry(key)?;
        entry
            .as_any()
            .downcast_ref::<Memo<T>>()
            .cloned()
            .ok_or_else(|| StoreError::ComputedTypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                found: entry.value_type(),
            })
    }

    /// Subscribe to state changes.
    ///
    /// The callback receives a snapshot after each applied patch.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&StateSnapshot) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    fn notify(&self) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
    }
}

impl Clone for SignalStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            computed: Arc::clone(&self.computed),
            subscribers: Arc::clone(&self.subscribers),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

/// Collects features and assembles a [`SignalStore`].
pub struct SignalStoreBuilder {
    features: Vec<Box<dyn StoreFeature>>,
    runtime: Arc<ReactiveRuntime>,
}

impl Default for SignalStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalStoreBuilder {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            runtime: ReactiveRuntime::current(),
        }
    }

    /// Use a specific runtime instead of the current one.
    pub fn runtime(mut self, runtime: Arc<ReactiveRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Append a feature. Features are installed in the order they are added.
    pub fn with_feature(mut self, feature: impl StoreFeature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Append a single plain state key.
    pub fn with_state(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_feature(StateEntry {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Install every feature's state and computed signals.
    ///
    /// Each feature sees the state of itself and all features added before
    /// it. Any key defined twice across features is rejected.
    pub fn build(self) -> Result<SignalStore, StoreError> {
        let runtime = Arc::clone(&self.runtime);
        ReactiveRuntime::with_runtime(Arc::clone(&runtime), || self.assemble(runtime))
    }

    fn assemble(self, runtime: Arc<ReactiveRuntime>) -> Result<SignalStore, StoreError> {
        let mut state: BTreeMap<String, Signal<Value>> = BTreeMap::new();
        let mut computed: BTreeMap<String, Arc<dyn ComputedSignal>> = BTreeMap::new();

        for feature in &self.features {
            let slice = feature.initial_state();
            for (key, value) in slice {
                if state.contains_key(&key) || computed.contains_key(&key) {
                    return Err(StoreError::DuplicateStateKey { key });
                }
                state.insert(key, Signal::new_in(Arc::clone(&runtime), value));
            }

            let view = StateSignals::new(
                state
                    .iter()
                    .map(|(key, signal)| (key.clone(), signal.read_only()))
                    .collect(),
            );
            for (key, signal) in feature.computed(&view)? {
                if state.contains_key(&key) || computed.contains_key(&key) {
                    return Err(StoreError::DuplicateComputedKey { key });
                }
                computed.insert(key, signal);
            }

            tracing::debug!(feature = feature.name(), "store feature installed");
        }

        tracing::debug!(
            state_keys = state.len(),
            computed_keys = computed.len(),
            "signal store assembled"
        );

        Ok(SignalStore {
            state: Arc::new(RwLock::new(state)),
            computed: Arc::new(computed),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            runtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::create_effect;
    use crate::store::feature::{ComputedSlice, StateSlice};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Pagination;

    impl StoreFeature for Pagination {
        fn initial_state(&self) -> StateSlice {
            StateSlice::from([
                ("pageSize".to_string(), json!(10)),
                ("currentPage".to_string(), json!(0)),
            ])
        }

        fn computed(&self, state: &StateSignals) -> Result<ComputedSlice, StoreError> {
            let page = state.get("currentPage")?;
            let mut slice = ComputedSlice::new();
            slice.insert(
                "isFirstPage",
                Memo::new(move || page.get().as_u64() == Some(0)),
            );
            Ok(slice)
        }
    }

    #[test]
    fn store_get_and_patch() {
        ReactiveRuntime::scope(|| {
            let store = SignalStore::builder()
                .with_feature(Pagination)
                .build()
                .unwrap();

            assert_eq!(store.state::<u64>("pageSize").unwrap(), 10);
            assert_eq!(store.computed_value("isFirstPage").unwrap(), json!(true));

            store.patch_state(StatePatch::single("currentPage", 2));
            assert_eq!(store.state_value("currentPage").unwrap(), json!(2));
            assert!(!store.computed::<bool>("isFirstPage").unwrap().get());
        });
    }

    #[test]
    fn patch_adds_unknown_keys() {
        ReactiveRuntime::scope(|| {
            let store = SignalStore::builder().build().unwrap();
            store.patch_state(StatePatch::single("filter", json!({ "from": "Wien" })));
            assert_eq!(
                store.snapshot(),
                StateSnapshot::from([("filter".to_string(), json!({ "from": "Wien" }))])
            );
        });
    }

    #[test]
    fn store_subscribe() {
        ReactiveRuntime::scope(|| {
            let store = SignalStore::builder()
                .with_state("count", 0)
                .build()
                .unwrap();

            let call_count = Arc::new(AtomicUsize::new(0));
            let call_count_clone = call_count.clone();

            store.subscribe(move |_state| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            });

            assert_eq!(call_count.load(Ordering::SeqCst), 0);

            store.patch_state(StatePatch::single("count", 1));
            assert_eq!(call_count.load(Ordering::SeqCst), 1);

            store.patch_state(StatePatch::new());
            assert_eq!(call_count.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn effects_never_see_a_half_applied_patch() {
        ReactiveRuntime::scope(|| {
            let store = SignalStore::builder()
                .with_feature(Pagination)
                .build()
                .unwrap();

            let seen = Arc::new(Mutex::new(Vec::new()));
            let _effect = create_effect({
                let store = store.clone();
                let seen = Arc::clone(&seen);
                move || {
                    let size = store.state::<u64>("pageSize").unwrap();
                    let page = store.state::<u64>("currentPage").unwrap();
                    seen.lock().unwrap().push((size, page));
                }
            });

            store.patch_state(StatePatch::single("pageSize", 20).with("currentPage", 3));
            assert_eq!(*seen.lock().unwrap(), vec![(10, 0), (20, 3)]);
        });
    }

    #[test]
    fn duplicate_state_keys_are_rejected() {
        ReactiveRuntime::scope(|| {
            let result = SignalStore::builder()
                .with_feature(Pagination)
                .with_state("pageSize", 20)
                .build();
            assert!(matches!(
                result,
                Err(StoreError::DuplicateStateKey { key }) if key == "pageSize"
            ));
        });
    }

    #[test]
    fn computed_type_is_checked() {
        ReactiveRuntime::scope(|| {
            let store = SignalStore::builder()
                .with_feature(Pagination)
                .build()
                .unwrap();

            assert!(matches!(
                store.computed::<String>("isFirstPage"),
                Err(StoreError::ComputedTypeMismatch { found: "bool", .. })
            ));
            assert!(matches!(
                store.computed_value("missing"),
                Err(StoreError::UnknownComputedKey { .. })
            ));
            assert!(matches!(
                store.state::<String>("pageSize"),
                Err(StoreError::Decode { .. })
            ));
        });
    }
}
