//! Keeps one subscription alive per dependency state, resubscribing on change.

use crate::{Deps, DepsTracker, Observable, Observer, RxStore, Subscription};

/// Subscription gated by dependency lists.
///
/// [`bind`](Self::bind) subscribes on first use and whenever the source or observer
/// dependency list changes, always disposing the previous subscription before the
/// new one is established. Dropping the binding disposes the active subscription.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{deps, BehaviorSubject, RxStore, StreamBinding};
///
/// let source = BehaviorSubject::<i32, ()>::new(1);
/// let store: RxStore<i32> = RxStore::new(0);
/// let mut binding = StreamBinding::new();
///
/// binding.sync_store(&store, deps![0], || source.clone());
/// source.next(2);
/// assert_eq!(store.get_value(), 2);
///
/// binding.dispose();
/// source.next(3);
/// assert_eq!(store.get_value(), 2);
/// ```
#[derive(Default)]
pub struct StreamBinding {
    source_deps: DepsTracker,
    observer_deps: DepsTracker,
    active: Option<Subscription>,
}

impl StreamBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `observer()` to `source()` unless both dependency lists are unchanged.
    ///
    /// Factories only run when a (re)subscription happens. Returns whether it did.
    pub fn bind<T, E, S, O>(
        &mut self,
        source_deps: Deps,
        source: impl FnOnce() -> S,
        observer_deps: Deps,
        observer: impl FnOnce() -> O,
    ) -> bool
    where
        T: Send + 'static,
        E: Send + 'static,
        S: Into<Observable<T, E>>,
        O: Observer<T, E> + 'static,
    {
        let source_changed = self.source_deps.changed(source_deps);
        let observer_changed = self.observer_deps.changed(observer_deps);
        if !source_changed && !observer_changed && self.active.is_some() {
            return false;
        }

        if let Some(previous) = self.active.take() {
            log::trace!("dependencies changed; resubscribing");
            previous.unsubscribe();
        }
        let source: Observable<T, E> = source().into();
        self.active = Some(source.subscribe(observer()));
        true
    }

    /// Keep `store` holding the latest value emitted by `source()`.
    ///
    /// Source errors and completion leave the store live with its last value.
    pub fn sync_store<T, E, S, SE>(
        &mut self,
        store: &RxStore<T, SE>,
        deps: Deps,
        source: impl FnOnce() -> S,
    ) -> bool
    where
        T: Clone + Send + 'static,
        E: Send + 'static,
        SE: Clone + Send + 'static,
        S: Into<Observable<T, E>>,
    {
        self.bind(deps, source, crate::deps![store.clone()], || store.sink::<E>())
    }

    /// The subscription currently held, if any.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.active.as_ref()
    }

    /// Dispose the active subscription and forget both dependency lists.
    pub fn dispose(&mut self) {
        if let Some(active) = self.active.take() {
            active.unsubscribe();
        }
        self.source_deps.reset();
        self.observer_deps.reset();
    }
}

impl Drop for StreamBinding {
    fn drop(&mut self) {
        self.dispose();
    }
}
