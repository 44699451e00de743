use crate::runtime::{NodeHandle, ReactiveRuntime};

/// A side effect that runs when its dependencies change.
///
/// The effect stays registered while this handle is alive; dropping it (or
/// calling [`Effect::dispose`]) stops it.
#[must_use = "the effect stops as soon as its handle is dropped"]
pub struct Effect {
    node: NodeHandle,
}

impl Effect {
    fn new<F>(effect: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        // Created first so a panicking first run still unregisters it
        let node = NodeHandle::new(ReactiveRuntime::current());

        // Runs immediately to collect dependencies
        node.runtime().register_effect(node.id(), effect);

        Self { node }
    }

    /// Stop reacting to changes.
    pub fn dispose(self) {
        tracing::trace!(effect = self.node.id(), "effect disposed");
    }
}

/// Create a new effect that runs when dependencies change.
///
/// The effect runs immediately and then again whenever any signal or memo it
/// read during its previous run changes.
///
/// # Example
///
/// ```
/// use callstate::{create_effect, Signal};
///
/// let count = Signal::new(0);
/// let _effect = create_effect({
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
/// ```
pub fn create_effect<F>(effect: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{create_memo, Signal};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn effect_runs_immediately() {
        ReactiveRuntime::scope(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            let counter_clone = counter.clone();

            let _effect = create_effect(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            });

            assert_eq!(counter.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn effect_reruns_through_memo() {
        ReactiveRuntime::scope(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            let source = Signal::new(0);
            let is_positive = create_memo({
                let source = source.clone();
                move || source.get() > 0
            });

            let _effect = create_effect({
                let counter = Arc::clone(&counter);
                move || {
                    let _ = is_positive.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            assert_eq!(counter.load(Ordering::SeqCst), 1);

            source.set(3);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn disposed_effect_stops_running() {
        ReactiveRuntime::scope(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            let source = Signal::new(0);

            let effect = create_effect({
                let counter = Arc::clone(&counter);
                let source = source.clone();
                move || {
                    let _ = source.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            source.set(1);
            assert_eq!(counter.load(Ordering::SeqCst), 2);

            effect.dispose();
            source.set(2);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn dropped_effect_stops_running() {
        let runtime = ReactiveRuntime::new();
        ReactiveRuntime::with_runtime(Arc::clone(&runtime), || {
            let counter = Arc::new(AtomicUsize::new(0));
            let source = Signal::new(0);

            let effect = create_effect({
                let counter = Arc::clone(&counter);
                let source = source.clone();
                move || {
                    let _ = source.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            assert_eq!(runtime.observer_count(), 1);

            drop(effect);
            assert_eq!(runtime.observer_count(), 0);
            assert_eq!(runtime.dependent_count(source.id()), 0);

            source.set(1);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        });
    }
}
