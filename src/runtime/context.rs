use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

type ObserverFn = Arc<dyn Fn() + Send + Sync>;

/// A node in some runtime's graph.
///
/// Edges may cross runtimes: an effect in one scope can read a memo that
/// lives in another. The runtime is held weakly so two graphs pointing at
/// each other never keep each other alive.
#[derive(Clone)]
struct NodeRef {
    runtime: Weak<ReactiveRuntime>,
    id: usize,
}

impl NodeRef {
    fn key(&self) -> (usize, usize) {
        (self.runtime.as_ptr() as usize, self.id)
    }

    fn mark_dirty(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.mark_observer_dirty(self.id);
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Dependency graph shared by every primitive created in one runtime.
#[derive(Default)]
struct Graph {
    // source id -> observers that read it
    dependents: HashMap<usize, HashSet<NodeRef>>,
    // observer id -> sources it read during its last run
    sources: HashMap<usize, HashSet<NodeRef>>,
    effects: HashMap<usize, ObserverFn>,
    memo_dirty: HashMap<usize, bool>,
}

impl Graph {
    fn dependents_of(&self, source_id: usize) -> Vec<NodeRef> {
        self.dependents
            .get(&source_id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Reactive runtime owning the dependency graph of signals, memos and effects.
///
/// Supports both a global runtime (default) and scoped runtimes for isolation.
/// Every primitive remembers the runtime it was created in, so a store built
/// inside a scope keeps working after the scope returns.
///
/// The observer whose reads are being tracked is per thread, not per
/// runtime, so several threads can drive the same store at once. A read is
/// linked to the active observer whichever runtime that observer belongs to.
///
/// # Examples
///
/// ```
/// use callstate::runtime::ReactiveRuntime;
/// use callstate::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// ```
pub struct ReactiveRuntime {
    me: Weak<ReactiveRuntime>,
    next_id: AtomicUsize,
    graph: Mutex<Graph>,
}

thread_local! {
    // Thread-local stack for scoped runtimes
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };

    // Innermost entry is the active observer; `None` entries come from `untracked`
    static OBSERVER_STACK: RefCell<Vec<Option<NodeRef>>> = const { RefCell::new(Vec::new()) };

    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING_EFFECTS: RefCell<Vec<NodeRef>> = const { RefCell::new(Vec::new()) };
}

/// Pops the observer pushed by `with_observer`/`untracked`, even on panic.
struct ObserverGuard;

impl ObserverGuard {
    fn push(observer: Option<NodeRef>) -> Self {
        OBSERVER_STACK.with(|stack| stack.borrow_mut().push(observer));
        ObserverGuard
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        OBSERVER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn active_observer() -> Option<NodeRef> {
    OBSERVER_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Queue `effect` if a batch is open on this thread.
fn defer_effect(effect: NodeRef) -> bool {
    if BATCH_DEPTH.with(Cell::get) == 0 {
        return false;
    }
    PENDING_EFFECTS.with(|pending| {
        let mut pending = pending.borrow_mut();
        if !pending.contains(&effect) {
            pending.push(effect);
        }
    });
    true
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| ReactiveRuntime {
            me: me.clone(),
            next_id: AtomicUsize::new(0),
            graph: Mutex::new(Graph::default()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Primitives created inside `f` belong to the fresh runtime; the graph is
    /// dropped once the last of them goes away.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// The process-wide fallback runtime.
    pub fn global() -> Arc<Self> {
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// The runtime is popped again even if `f` panics.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| stack.borrow_mut().push(runtime));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Defer effect re-runs until `f` returns.
    ///
    /// Writes inside `f` still mark memos dirty right away; every effect they
    /// reach runs once, after the outermost batch on this thread closes.
    pub fn batch<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        struct BatchGuard;

        impl Drop for BatchGuard {
            fn drop(&mut self) {
                let depth = BATCH_DEPTH.with(|depth| {
                    depth.set(depth.get() - 1);
                    depth.get()
                });
                if depth == 0 && std::thread::panicking() {
                    PENDING_EFFECTS.with(|pending| pending.borrow_mut().clear());
                }
            }
        }

        BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let guard = BatchGuard;
        let result = f();
        drop(guard);

        if BATCH_DEPTH.with(Cell::get) == 0 {
            let pending = PENDING_EFFECTS.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
            for effect in pending {
                if let Some(runtime) = effect.runtime.upgrade() {
                    runtime.rerun_effect(effect.id);
                }
            }
        }
        result
    }

    /// Run a function without tracking any reads.
    pub fn untracked<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ObserverGuard::push(None);
        f()
    }

    /// Drop all observers and dependencies.
    ///
    /// Ids keep counting up, so handles created before the clear never alias
    /// nodes created after it.
    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.graph());
        // Effect bodies may own primitives whose drop locks the graph again
        drop(old);
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn node(&self, id: usize) -> NodeRef {
        NodeRef {
            runtime: self.me.clone(),
            id,
        }
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record that this thread's active observer (if any) read `source_id`.
    pub fn track_read(&self, source_id: usize) {
        let Some(observer) = active_observer() else {
            return;
        };
        let source = self.node(source_id);
        if observer == source {
            return;
        }
        let Some(observer_runtime) = observer.runtime.upgrade() else {
            return;
        };

        // One graph lock at a time: the two runtimes may be the same
        self.graph()
            .dependents
            .entry(source_id)
            .or_default()
            .insert(observer.clone());
        observer_runtime
            .graph()
            .sources
            .entry(observer.id)
            .or_default()
            .insert(source);
    }

    /// Propagate a write of `source_id` to everything that read it.
    pub fn notify_observers(&self, source_id: usize) {
        let observers = self.graph().dependents_of(source_id);
        for observer in observers {
            observer.mark_dirty();
        }
    }

    /// Memos are marked dirty (and their dependents notified); effects re-run.
    fn mark_observer_dirty(&self, observer_id: usize) {
        let mut graph = self.graph();

        if let Some(dirty) = graph.memo_dirty.get_mut(&observer_id) {
            if *dirty {
                return;
            }
            *dirty = true;
            let dependents = graph.dependents_of(observer_id);
            drop(graph);
            for dependent in dependents {
                dependent.mark_dirty();
            }
            return;
        }

        let effect = graph.effects.get(&observer_id).cloned();
        drop(graph);

        if let Some(effect) = effect {
            if !defer_effect(self.node(observer_id)) {
                self.run_effect(observer_id, effect);
            }
        }
    }

    /// Register an effect body and run it once to collect its dependencies.
    pub fn register_effect<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect: ObserverFn = Arc::new(f);
        self.graph().effects.insert(observer_id, Arc::clone(&effect));
        self.run_effect(observer_id, effect);
    }

    fn rerun_effect(&self, observer_id: usize) {
        let effect = self.graph().effects.get(&observer_id).cloned();
        if let Some(effect) = effect {
            self.run_effect(observer_id, effect);
        }
    }

    fn run_effect(&self, observer_id: usize, effect: ObserverFn) {
        self.clear_sources(observer_id);
        self.with_observer(observer_id, || effect());
    }

    /// Drop a node and every edge touching it.
    pub fn remove_node(&self, id: usize) {
        let mut graph = self.graph();
        let effect = graph.effects.remove(&id);
        graph.memo_dirty.remove(&id);
        let dependents = graph.dependents.remove(&id);
        drop(graph);

        self.clear_sources(id);
        let node = self.node(id);
        for observer in dependents.into_iter().flatten() {
            if let Some(runtime) = observer.runtime.upgrade() {
                if let Some(sources) = runtime.graph().sources.get_mut(&observer.id) {
                    sources.remove(&node);
                }
            }
        }

        // Outside the lock: the effect body may own other primitives
        drop(effect);
    }

    /// Forget what `observer_id` read last time, before it runs again.
    pub fn clear_sources(&self, observer_id: usize) {
        let sources = self.graph().sources.remove(&observer_id);
        let observer = self.node(observer_id);
        for source in sources.into_iter().flatten() {
            if let Some(runtime) = source.runtime.upgrade() {
                if let Some(deps) = runtime.graph().dependents.get_mut(&source.id) {
                    deps.remove(&observer);
                }
            }
        }
    }

    /// Run a function with a specific observer as this thread's active one.
    ///
    /// The previous observer is restored even if `f` panics.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ObserverGuard::push(Some(self.node(observer_id)));
        f()
    }

    /// Register a memo and mark it as dirty initially.
    pub fn register_memo(&self, memo_id: usize) {
        self.graph().memo_dirty.insert(memo_id, true);
    }

    /// Check if a memo is dirty (needs recomputation).
    pub fn is_memo_dirty(&self, memo_id: usize) -> bool {
        self.graph().memo_dirty.get(&memo_id).copied().unwrap_or(true)
    }

    /// Mark a memo as clean (after recomputation).
    pub fn mark_memo_clean(&self, memo_id: usize) {
        self.graph().memo_dirty.insert(memo_id, false);
    }

    /// Number of observers currently depending on `source_id`.
    pub fn dependent_count(&self, source_id: usize) -> usize {
        self.graph().dependents.get(&source_id).map_or(0, HashSet::len)
    }

    /// Number of memos and effects registered in this runtime.
    pub fn observer_count(&self) -> usize {
        let graph = self.graph();
        graph.memo_dirty.len() + graph.effects.len()
    }
}

/// Registration of one primitive in its runtime.
///
/// Shared by every clone of the primitive; dropping the last one removes the
/// node and its edges from the graph.
pub(crate) struct NodeHandle {
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl NodeHandle {
    pub(crate) fn new(runtime: Arc<ReactiveRuntime>) -> Self {
        let id = runtime.next_id();
        Self { id, runtime }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn runtime(&self) -> &ReactiveRuntime {
        &self.runtime
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.runtime.remove_node(self.id);
    }
}
