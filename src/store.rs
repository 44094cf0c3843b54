//! Synchronously readable, change-notifying value cells built over a [`BehaviorSubject`].

use core::convert::Infallible;
use std::fmt;

use crate::{BehaviorSubject, Observable, Observer, PartialObserver, Subscription};

/// Capability contract a host needs to keep a rendered value in sync with a store.
///
/// `subscribe_changes` registers a callback fired after every accepted change and
/// returns the subscription disposing it. `get_value` never blocks.
pub trait ExternalStore<T>: Send + Sync {
    fn subscribe_changes(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription;

    fn get_value(&self) -> T;
}

/// A literal value or a modifier applied to the current value.
pub enum SetState<T> {
    Value(T),
    Modify(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> SetState<T> {
    pub fn modify(modifier: impl FnOnce(&T) -> T + Send + 'static) -> Self {
        SetState::Modify(Box::new(modifier))
    }

    /// The value to apply, reading the current value only for modifiers.
    pub fn resolve(self, current: impl FnOnce() -> T) -> T {
        match self {
            SetState::Value(value) => value,
            SetState::Modify(modifier) => modifier(&current()),
        }
    }
}

impl<T> From<T> for SetState<T> {
    fn from(value: T) -> Self {
        SetState::Value(value)
    }
}

/// Reactive store: a single slot holding the latest value.
///
/// Composes a [`BehaviorSubject`] with change notification for hosts. Updates through
/// [`next`](Self::next) and [`dispatch`](Self::dispatch) are applied and notified
/// synchronously, without batching. Clones share the same store, and equality is
/// identity.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{create_store, RxStore, StoreInput};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store: RxStore<i32> = create_store(StoreInput::Value(5));
/// let changes = Arc::new(AtomicUsize::new(0));
/// let counter = changes.clone();
/// store.subscribe_changes(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// store.next(10);
///
/// assert_eq!(store.get_value(), 10);
/// assert_eq!(changes.load(Ordering::SeqCst), 1);
/// ```
pub struct RxStore<T, E = Infallible> {
    subject: BehaviorSubject<T, E>,
}

impl<T, E> Clone for RxStore<T, E> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for RxStore<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxStore")
            .field("subject", &self.subject)
            .finish()
    }
}

impl<T, E> PartialEq for RxStore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T, E> RxStore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A store owning a fresh subject seeded with `initial`.
    pub fn new(initial: T) -> Self {
        Self::from_subject(BehaviorSubject::new(initial))
    }

    fn from_subject(subject: BehaviorSubject<T, E>) -> Self {
        Self { subject }
    }

    pub fn get_value(&self) -> T {
        self.subject.get_value()
    }

    pub fn next(&self, value: T) {
        self.subject.next(value);
    }

    /// Apply `modifier` to the current value.
    pub fn modify(&self, modifier: impl FnOnce(&T) -> T) {
        let next = modifier(&self.get_value());
        self.next(next);
    }

    pub fn dispatch(&self, action: SetState<T>) {
        let next = action.resolve(|| self.get_value());
        self.next(next);
    }

    /// Fire `on_change` after every accepted change.
    ///
    /// The current value is not replayed. Disposing the returned subscription stops
    /// notifications.
    pub fn subscribe_changes(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.subject
            .subscribe_changes(PartialObserver::new().on_next(move |_| on_change()))
    }

    /// Subscribe to values, starting with the current one.
    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        self.subject.subscribe(observer)
    }

    /// Terminate the store. Later updates are ignored.
    pub fn complete(&self) {
        self.subject.complete();
    }

    pub fn is_completed(&self) -> bool {
        self.subject.is_stopped()
    }

    pub fn subject(&self) -> &BehaviorSubject<T, E> {
        &self.subject
    }

    pub fn as_observable(&self) -> Observable<T, E> {
        self.subject.as_observable()
    }

    /// Observer writing every value it receives into this store.
    ///
    /// Errors and completion of the observed source are not forwarded, so the store
    /// stays live for later sources.
    pub fn sink<S: Send + 'static>(&self) -> PartialObserver<T, S> {
        let store = self.clone();
        PartialObserver::new()
            .on_next(move |value| store.next(value))
            .on_error(|_| log::debug!("store sink ignored a source error"))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.subject.ptr_eq(&other.subject)
    }
}

impl<T, E> ExternalStore<T> for RxStore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn subscribe_changes(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription {
        RxStore::subscribe_changes(self, on_change)
    }

    fn get_value(&self) -> T {
        RxStore::get_value(self)
    }
}

impl<T, E> From<&RxStore<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(store: &RxStore<T, E>) -> Self {
        store.as_observable()
    }
}

impl<T, E> From<RxStore<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(store: RxStore<T, E>) -> Self {
        store.as_observable()
    }
}

/// What a store can be created from.
pub enum StoreInput<T, E = Infallible> {
    Value(T),
    Lazy(Box<dyn FnOnce() -> T + Send>),
    Subject(BehaviorSubject<T, E>),
    LazySubject(Box<dyn FnOnce() -> BehaviorSubject<T, E> + Send>),
    Store(RxStore<T, E>),
}

impl<T, E> StoreInput<T, E> {
    pub fn lazy(produce: impl FnOnce() -> T + Send + 'static) -> Self {
        StoreInput::Lazy(Box::new(produce))
    }

    pub fn lazy_subject(produce: impl FnOnce() -> BehaviorSubject<T, E> + Send + 'static) -> Self {
        StoreInput::LazySubject(Box::new(produce))
    }

    /// Whether the input already is a store and would be returned unchanged.
    pub fn is_store(&self) -> bool {
        matches!(self, StoreInput::Store(_))
    }
}

impl<T, E> From<RxStore<T, E>> for StoreInput<T, E> {
    fn from(store: RxStore<T, E>) -> Self {
        StoreInput::Store(store)
    }
}

impl<T, E> From<BehaviorSubject<T, E>> for StoreInput<T, E> {
    fn from(subject: BehaviorSubject<T, E>) -> Self {
        StoreInput::Subject(subject)
    }
}

/// Who is responsible for completing a resolved store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ownership {
    /// Created or wrapped here; the creator completes it.
    Owned,
    /// Already a store supplied by the caller, who keeps responsibility for it.
    Borrowed,
}

/// Create a store from `input`.
///
/// Producer functions run exactly once. A live store is returned unchanged. A
/// terminated source is never exposed: it is replaced by a fresh, live store
/// seeded with the source's last value.
pub fn create_store<T, E>(input: StoreInput<T, E>) -> RxStore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    resolve_store(input).0
}

pub(crate) fn resolve_store<T, E>(input: StoreInput<T, E>) -> (RxStore<T, E>, Ownership)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (subject, ownership) = match input {
        StoreInput::Value(value) => (BehaviorSubject::new(value), Ownership::Owned),
        StoreInput::Lazy(produce) => (BehaviorSubject::new(produce()), Ownership::Owned),
        StoreInput::Subject(subject) => (subject, Ownership::Owned),
        StoreInput::LazySubject(produce) => (produce(), Ownership::Owned),
        StoreInput::Store(store) => (store.subject, Ownership::Borrowed),
    };

    if subject.is_stopped() {
        log::debug!("replacing terminated source with a live store");
        let fresh = BehaviorSubject::new(subject.get_value());
        return (RxStore::from_subject(fresh), Ownership::Owned);
    }

    (RxStore::from_subject(subject), ownership)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn given_a_value_should_create_a_store_reading_it() {
        let store: RxStore<&str> = create_store(StoreInput::Value("a"));

        assert_eq!(store.get_value(), "a");
        assert!(!store.is_completed());
    }

    #[test]
    fn given_a_lazy_value_should_call_the_producer_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let store: RxStore<i32> = create_store(StoreInput::lazy(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            3
        }));

        assert_eq!(store.get_value(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_a_store_should_return_it_unchanged() {
        let store: RxStore<i32> = RxStore::new(1);
        let input = StoreInput::from(store.clone());
        assert!(input.is_store());

        let (resolved, ownership) = resolve_store(input);

        assert!(resolved == store);
        assert_eq!(ownership, Ownership::Borrowed);
    }

    #[test]
    fn given_a_live_subject_should_wrap_it_and_take_ownership() {
        let subject = BehaviorSubject::<i32, Infallible>::new(2);

        let (store, ownership) = resolve_store(StoreInput::from(subject.clone()));
        store.next(4);

        assert_eq!(subject.get_value(), 4);
        assert_eq!(ownership, Ownership::Owned);
    }

    #[test]
    fn given_a_terminated_subject_should_create_a_fresh_live_store_with_its_value() {
        let subject = BehaviorSubject::<i32, Infallible>::new(7);
        subject.complete();

        let (store, ownership) = resolve_store(StoreInput::from(subject.clone()));

        assert!(!store.is_completed());
        assert_eq!(store.get_value(), 7);
        assert!(!store.subject().ptr_eq(&subject));
        assert_eq!(ownership, Ownership::Owned);
    }

    #[test]
    fn given_an_errored_subject_should_create_a_fresh_live_store_with_its_value() {
        let subject = BehaviorSubject::<i32, &'static str>::new(7);
        subject.error("boom");

        let (store, ownership) = resolve_store(StoreInput::from(subject.clone()));
        store.next(8);

        assert!(!store.is_completed());
        assert_eq!(store.get_value(), 8);
        assert_eq!(subject.get_value(), 7);
        assert!(!store.subject().ptr_eq(&subject));
        assert_eq!(ownership, Ownership::Owned);
    }

    #[test]
    fn given_a_completed_store_should_replace_it_with_a_live_one() {
        let completed: RxStore<i32> = RxStore::new(3);
        completed.complete();

        let (store, ownership) = resolve_store(StoreInput::from(completed.clone()));

        assert!(store != completed);
        assert!(!store.is_completed());
        assert_eq!(store.get_value(), 3);
        assert_eq!(ownership, Ownership::Owned);
    }

    #[test]
    fn given_a_modifier_should_apply_it_to_the_current_value() {
        let store: RxStore<i32> = RxStore::new(2);

        store.dispatch(SetState::modify(|current| current * 10));
        store.dispatch(5.into());
        store.modify(|current| current + 1);

        assert_eq!(store.get_value(), 6);
    }

    #[test]
    fn given_a_change_listener_when_disposed_should_stop_notifying() {
        let store: RxStore<i32> = RxStore::new(0);
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = changes.clone();
        let subscription = store.subscribe_changes(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.next(1);
        subscription.unsubscribe();
        store.next(2);

        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_a_completed_store_should_ignore_updates() {
        let store: RxStore<i32> = RxStore::new(0);

        store.complete();
        store.next(1);

        assert!(store.is_completed());
        assert_eq!(store.get_value(), 0);
    }
}
