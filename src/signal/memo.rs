use crate::runtime::{NodeHandle, ReactiveRuntime};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A memoized computed value that automatically tracks dependencies.
///
/// Memos are lazy: they recompute on the first `get` after one of their
/// dependencies changed, and return the cached value otherwise. Dropping the
/// last clone unregisters the memo and unlinks it from what it read.
pub struct Memo<T> {
    compute: Arc<dyn Fn() -> T + Send + Sync>,
    cached: Arc<RwLock<Option<T>>>,
    node: Arc<NodeHandle>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            compute: Arc::clone(&self.compute),
            cached: Arc::clone(&self.cached),
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let node = NodeHandle::new(ReactiveRuntime::current());

        // Dirty until the first read
        node.runtime().register_memo(node.id());

        Self {
            compute: Arc::new(compute),
            cached: Arc::new(RwLock::new(None)),
            node: Arc::new(node),
        }
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        let (id, runtime) = (self.node.id(), self.node.runtime());
        runtime.track_read(id);

        if !runtime.is_memo_dirty(id) {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = cached.as_ref() {
                return value.clone();
            }
        }

        runtime.clear_sources(id);
        let value = runtime.with_observer(id, || (self.compute)());
        tracing::trace!(memo = id, "memo recomputed");
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        runtime.mark_memo_clean(id);
        value
    }

    pub fn id(&self) -> usize {
        self.node.id()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Memo")
            .field("id", &self.node.id())
            .field("cached", &*cached)
            .finish()
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use callstate::{create_memo, Signal};
///
/// let count = Signal::new(5);
/// let doubled = create_memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}
