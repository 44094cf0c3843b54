//! Multicast producers that are also observers.

use std::fmt;
use std::sync::Arc;

use spin::Mutex;

use crate::{Observable, Observer, Subscriber, Subscription};

enum Terminal<E> {
    Completed,
    Errored(E),
}

struct SubjectState<T, E> {
    subscribers: Vec<(u64, Subscriber<T, E>)>,
    next_id: u64,
    stopped: Option<Terminal<E>>,
}

/// Multicast producer: every `next` reaches every live subscriber.
///
/// Once terminated, late subscribers receive the terminal event only.
pub struct Subject<T, E> {
    state: Arc<Mutex<SubjectState<T, E>>>,
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Subject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subject")
            .field("subscribers", &state.subscribers.len())
            .field("stopped", &state.stopped.is_some())
            .finish()
    }
}

impl<T, E> Default for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                subscribers: Vec::new(),
                next_id: 0,
                stopped: None,
            })),
        }
    }

    pub fn next(&self, value: T) {
        let targets: Vec<Subscriber<T, E>> = {
            let state = self.state.lock();
            if state.stopped.is_some() {
                return;
            }
            state.subscribers.iter().map(|(_, s)| s.clone()).collect()
        };
        for subscriber in targets {
            subscriber.next(value.clone());
        }
    }

    pub fn error(&self, error: E) {
        let targets = {
            let mut state = self.state.lock();
            if state.stopped.is_some() {
                return;
            }
            state.stopped = Some(Terminal::Errored(error.clone()));
            core::mem::take(&mut state.subscribers)
        };
        for (_, subscriber) in targets {
            subscriber.error(error.clone());
        }
    }

    pub fn complete(&self) {
        let targets = {
            let mut state = self.state.lock();
            if state.stopped.is_some() {
                return;
            }
            state.stopped = Some(Terminal::Completed);
            core::mem::take(&mut state.subscribers)
        };
        for (_, subscriber) in targets {
            subscriber.complete();
        }
    }

    /// Whether a terminal event has been received.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped.is_some()
    }

    pub fn has_error(&self) -> bool {
        matches!(self.state.lock().stopped, Some(Terminal::Errored(_)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        let subscriber = Subscriber::new(Box::new(observer));
        let subscription = subscriber.subscription().clone();
        self.attach(subscriber);
        subscription
    }

    pub fn as_observable(&self) -> Observable<T, E> {
        let subject = self.clone();
        Observable::new(move |subscriber| subject.attach(subscriber))
    }

    pub(crate) fn attach(&self, subscriber: Subscriber<T, E>) {
        let mut state = self.state.lock();
        match &state.stopped {
            Some(Terminal::Errored(error)) => {
                let error = error.clone();
                drop(state);
                subscriber.error(error);
                return;
            }
            Some(Terminal::Completed) => {
                drop(state);
                subscriber.complete();
                return;
            }
            None => {}
        }

        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, subscriber.clone()));
        drop(state);

        let weak = Arc::downgrade(&self.state);
        subscriber.add_teardown(move || {
            if let Some(state) = weak.upgrade() {
                let removed = {
                    let mut state = state.lock();
                    let index = state.subscribers.iter().position(|(i, _)| *i == id);
                    index.map(|index| state.subscribers.remove(index))
                };
                drop(removed);
            }
        });
    }
}

impl<T, E> Observer<T, E> for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn next(&mut self, value: T) {
        Subject::next(self, value);
    }

    fn error(&mut self, error: E) {
        Subject::error(self, error);
    }

    fn complete(&mut self) {
        Subject::complete(self);
    }
}

impl<T, E> From<&Subject<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(subject: &Subject<T, E>) -> Self {
        subject.as_observable()
    }
}

impl<T, E> From<Subject<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(subject: Subject<T, E>) -> Self {
        subject.as_observable()
    }
}

/// Stateful subject holding the latest value.
///
/// New subscribers receive the current value immediately while the subject is live.
/// After termination the value stays readable through [`get_value`](Self::get_value)
/// but is no longer replayed and no longer changes.
///
/// # Example
///
/// ```rust
/// use oxide_rx::BehaviorSubject;
///
/// let subject = BehaviorSubject::<i32, ()>::new(1);
/// subject.next(2);
/// assert_eq!(subject.get_value(), 2);
///
/// subject.complete();
/// subject.next(3);
/// assert_eq!(subject.get_value(), 2);
/// ```
pub struct BehaviorSubject<T, E> {
    value: Arc<Mutex<T>>,
    subject: Subject<T, E>,
}

impl<T, E> Clone for BehaviorSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for BehaviorSubject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &*self.value.lock())
            .field("subject", &self.subject)
            .finish()
    }
}

impl<T, E> BehaviorSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
            subject: Subject::new(),
        }
    }

    /// The latest value, read synchronously.
    pub fn get_value(&self) -> T {
        self.value.lock().clone()
    }

    pub fn next(&self, value: T) {
        if self.subject.is_stopped() {
            return;
        }
        *self.value.lock() = value.clone();
        self.subject.next(value);
    }

    pub fn error(&self, error: E) {
        self.subject.error(error);
    }

    pub fn complete(&self) {
        self.subject.complete();
    }

    pub fn is_stopped(&self) -> bool {
        self.subject.is_stopped()
    }

    pub fn has_error(&self) -> bool {
        self.subject.has_error()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Subscribe, receiving the current value first.
    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        let subscriber = Subscriber::new(Box::new(observer));
        let subscription = subscriber.subscription().clone();
        self.attach(subscriber);
        subscription
    }

    /// Subscribe to later changes only, skipping the replay of the current value.
    pub(crate) fn subscribe_changes(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        self.subject.subscribe(observer)
    }

    pub fn as_observable(&self) -> Observable<T, E> {
        let subject = self.clone();
        Observable::new(move |subscriber| subject.attach(subscriber))
    }

    fn attach(&self, subscriber: Subscriber<T, E>) {
        self.subject.attach(subscriber.clone());
        if !subscriber.is_closed() {
            subscriber.next(self.get_value());
        }
    }
}

impl<T, E> Observer<T, E> for BehaviorSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn next(&mut self, value: T) {
        BehaviorSubject::next(self, value);
    }

    fn error(&mut self, error: E) {
        BehaviorSubject::error(self, error);
    }

    fn complete(&mut self) {
        BehaviorSubject::complete(self);
    }
}

impl<T, E> From<&BehaviorSubject<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(subject: &BehaviorSubject<T, E>) -> Self {
        subject.as_observable()
    }
}

impl<T, E> From<BehaviorSubject<T, E>> for Observable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(subject: BehaviorSubject<T, E>) -> Self {
        subject.as_observable()
    }
}
