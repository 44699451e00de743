use crate::runtime::{NodeHandle, ReactiveRuntime};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A reactive signal that holds a value and notifies dependents when changed.
///
/// The signal leaves its runtime's graph when the last clone is dropped.
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    node: Arc<NodeHandle>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal in the current runtime.
    pub fn new(initial: T) -> Self {
        Self::new_in(ReactiveRuntime::current(), initial)
    }

    /// Create a new signal owned by a specific runtime.
    pub fn new_in(runtime: Arc<ReactiveRuntime>, initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            node: Arc::new(NodeHandle::new(runtime)),
        }
    }

    /// Get the current value, registering a dependency for the active observer.
    pub fn get(&self) -> T {
        self.node.runtime().track_read(self.node.id());
        self.peek()
    }

    /// Get the current value without tracking.
    pub fn peek(&self) -> T {
        self.value.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.runtime().track_read(self.node.id());
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&value)
    }

    /// Set a new value and notify dependents.
    pub fn set(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
        self.node.runtime().notify_observers(self.node.id());
    }

    /// Update the value in place and notify dependents.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut value);
        }
        self.node.runtime().notify_observers(self.node.id());
    }

    /// A handle that can read but not write this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            inner: self.clone(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.node.id()
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Signal")
            .field("id", &self.node.id())
            .field("value", &*value)
            .finish()
    }
}

/// Read-only view of a [`Signal`].
///
/// Store state is handed to features as `ReadSignal`s so that the only way to
/// change it is through a state patch.
pub struct ReadSignal<T> {
    inner: Signal<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn peek(&self) -> T {
        self.inner.peek()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn id(&self) -> usize {
        self.inner.id()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
