//! Push-based producers: observers, guarded subscribers and lazily subscribed observables.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use spin::Mutex;

use crate::{Rejection, Subscription, Timer, TimerId};

/// Consumer of a push-based producer.
///
/// A producer delivers zero or more [`next`](Self::next) events followed by at most
/// one terminal event, [`error`](Self::error) or [`complete`](Self::complete).
pub trait Observer<T, E>: Send {
    fn next(&mut self, value: T);

    fn error(&mut self, error: E);

    fn complete(&mut self);
}

/// Observer assembled from optional closures. Missing handlers ignore their event.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{Observable, PartialObserver};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
///
/// Observable::<i32, ()>::of(vec![1, 2])
///     .subscribe(PartialObserver::new().on_next(move |v| sink.lock().unwrap().push(v)));
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
#[allow(clippy::type_complexity)]
pub struct PartialObserver<T, E> {
    next: Option<Box<dyn FnMut(T) + Send>>,
    error: Option<Box<dyn FnMut(E) + Send>>,
    complete: Option<Box<dyn FnMut() + Send>>,
}

impl<T, E> Default for PartialObserver<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> PartialObserver<T, E> {
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    pub fn on_next(mut self, next: impl FnMut(T) + Send + 'static) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn on_error(mut self, error: impl FnMut(E) + Send + 'static) -> Self {
        self.error = Some(Box::new(error));
        self
    }

    pub fn on_complete(mut self, complete: impl FnMut() + Send + 'static) -> Self {
        self.complete = Some(Box::new(complete));
        self
    }
}

impl<T, E> Observer<T, E> for PartialObserver<T, E> {
    fn next(&mut self, value: T) {
        if let Some(next) = self.next.as_mut() {
            next(value);
        }
    }

    fn error(&mut self, error: E) {
        if let Some(on_error) = self.error.as_mut() {
            on_error(error);
        }
    }

    fn complete(&mut self) {
        if let Some(complete) = self.complete.as_mut() {
            complete();
        }
    }
}

impl<T, E> Observer<T, E> for Box<dyn Observer<T, E>> {
    fn next(&mut self, value: T) {
        (**self).next(value);
    }

    fn error(&mut self, error: E) {
        (**self).error(error);
    }

    fn complete(&mut self) {
        (**self).complete();
    }
}

enum Notification<T, E> {
    Next(T),
    Error(E),
    Complete,
}

impl<T, E> Notification<T, E> {
    fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

struct SubscriberState<T, E> {
    observer: Option<Box<dyn Observer<T, E>>>,
    /// No further events reach the observer.
    closed: bool,
    /// A terminal event was accepted, possibly still queued.
    terminated: bool,
    delivering: bool,
    queue: VecDeque<Notification<T, E>>,
}

/// Guarded sink handed to producers.
///
/// Events are forwarded to the wrapped observer until a terminal event is delivered
/// or the subscription is disposed. After a terminal event the subscriber disposes
/// its own [`Subscription`], running every teardown the producer registered.
///
/// Events emitted re-entrantly from inside an observer callback are queued and
/// delivered in order once that callback returns. No lock is held while the
/// observer runs.
pub struct Subscriber<T, E> {
    state: Arc<Mutex<SubscriberState<T, E>>>,
    subscription: Subscription,
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> Subscriber<T, E> {
    pub(crate) fn new(observer: Box<dyn Observer<T, E>>) -> Self {
        let state = Arc::new(Mutex::new(SubscriberState {
            observer: Some(observer),
            closed: false,
            terminated: false,
            delivering: false,
            queue: VecDeque::new(),
        }));

        let subscription = Subscription::new();
        let weak = Arc::downgrade(&state);
        subscription.add_teardown(move || {
            if let Some(state) = weak.upgrade() {
                let released = {
                    let mut state = state.lock();
                    state.closed = true;
                    (state.observer.take(), core::mem::take(&mut state.queue))
                };
                drop(released);
            }
        });

        Self {
            state,
            subscription,
        }
    }

    pub fn next(&self, value: T) {
        self.deliver(Notification::Next(value));
    }

    pub fn error(&self, error: E) {
        self.deliver(Notification::Error(error));
    }

    pub fn complete(&self) {
        self.deliver(Notification::Complete);
    }

    /// Whether further events would be ignored.
    pub fn is_closed(&self) -> bool {
        let state = self.state.lock();
        state.closed || state.terminated
    }

    /// The subscription consumers hold for this subscriber.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Register producer cleanup to run when this subscriber is disposed.
    pub fn add_teardown(&self, teardown: impl FnOnce() + Send + 'static) {
        self.subscription.add_teardown(teardown);
    }

    fn deliver(&self, notification: Notification<T, E>) {
        let mut observer = {
            let mut state = self.state.lock();
            if state.closed || state.terminated {
                return;
            }
            if notification.is_terminal() {
                state.terminated = true;
            }
            if state.delivering {
                state.queue.push_back(notification);
                return;
            }
            match state.observer.take() {
                Some(observer) => {
                    state.delivering = true;
                    observer
                }
                None => return,
            }
        };

        let mut pending = notification;
        loop {
            let terminal = pending.is_terminal();
            match pending {
                Notification::Next(value) => observer.next(value),
                Notification::Error(error) => observer.error(error),
                Notification::Complete => observer.complete(),
            }

            let mut state = self.state.lock();
            if terminal || state.closed {
                state.closed = true;
                state.delivering = false;
                let queued = core::mem::take(&mut state.queue);
                drop(state);
                drop(queued);
                drop(observer);
                if terminal {
                    self.subscription.unsubscribe();
                }
                return;
            }
            match state.queue.pop_front() {
                Some(next) => pending = next,
                None => {
                    state.observer = Some(observer);
                    state.delivering = false;
                    return;
                }
            }
        }
    }
}

type Producer<T, E> = dyn Fn(Subscriber<T, E>) + Send + Sync;

/// A lazily subscribed push-based producer.
///
/// The producer closure runs once per [`subscribe`](Self::subscribe) call and pushes
/// events into the [`Subscriber`] it receives. Cloning shares the producer.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{Observable, PartialObserver};
///
/// let ticks = Observable::<u32, ()>::new(|subscriber| {
///     subscriber.next(1);
///     subscriber.next(2);
///     subscriber.complete();
/// });
///
/// let subscription = ticks.subscribe(PartialObserver::new());
/// assert!(subscription.is_closed());
/// ```
pub struct Observable<T, E> {
    producer: Arc<Producer<T, E>>,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> Observable<T, E> {
    pub fn new(producer: impl Fn(Subscriber<T, E>) + Send + Sync + 'static) -> Self {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// Run the producer against `observer`.
    ///
    /// The returned subscription is already closed if the producer terminated
    /// synchronously.
    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        let subscriber = Subscriber::new(Box::new(observer));
        let subscription = subscriber.subscription().clone();
        (self.producer)(subscriber);
        subscription
    }

    /// Subscribe with a `next` handler only.
    pub fn subscribe_next(&self, next: impl FnMut(T) + Send + 'static) -> Subscription {
        self.subscribe(PartialObserver::new().on_next(next))
    }

    /// Emit each value in order, then complete.
    pub fn of(values: Vec<T>) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move |subscriber| {
            for value in values.iter() {
                if subscriber.is_closed() {
                    return;
                }
                subscriber.next(value.clone());
            }
            subscriber.complete();
        })
    }

    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone + Sync,
    {
        Self::of(values.into_iter().collect())
    }

    /// Complete immediately without emitting.
    pub fn empty() -> Self {
        Self::new(|subscriber| subscriber.complete())
    }

    /// Never emit and never terminate.
    pub fn never() -> Self {
        Self::new(|_| {})
    }

    /// Fail immediately with `error`.
    pub fn throw_error(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::new(move |subscriber| subscriber.error(error.clone()))
    }

    /// Shift every value by `duration` on `timer`.
    ///
    /// Completion waits for the last delayed value; errors pass through at once.
    /// Disposing the subscription clears every pending timer.
    pub fn delay<Tm>(&self, timer: Tm, duration: Duration) -> Self
    where
        Tm: Timer + Clone + 'static,
    {
        let upstream = self.clone();
        Self::new(move |subscriber: Subscriber<T, E>| {
            let state = Arc::new(Mutex::new(DelayState {
                in_flight: 0,
                upstream_done: false,
                next_key: 0,
                pending: BTreeMap::new(),
            }));

            let teardown_timer = timer.clone();
            let teardown_state = state.clone();
            subscriber.add_teardown(move || {
                let pending = core::mem::take(&mut teardown_state.lock().pending);
                for id in pending.into_values().flatten() {
                    teardown_timer.clear_timeout(id);
                }
            });

            let on_next = {
                let timer = timer.clone();
                let state = state.clone();
                let subscriber = subscriber.clone();
                move |value: T| {
                    let key = {
                        let mut state = state.lock();
                        let key = state.next_key;
                        state.next_key += 1;
                        state.in_flight += 1;
                        state.pending.insert(key, None);
                        key
                    };
                    let fired_state = state.clone();
                    let downstream = subscriber.clone();
                    let id = timer.set_timeout(
                        duration,
                        Box::new(move || {
                            fired_state.lock().pending.remove(&key);
                            downstream.next(value);
                            let finished = {
                                let mut state = fired_state.lock();
                                state.in_flight -= 1;
                                state.upstream_done && state.in_flight == 0
                            };
                            if finished {
                                downstream.complete();
                            }
                        }),
                    );
                    // A timer may fire before returning its id; the key is gone by then.
                    if let Some(slot) = state.lock().pending.get_mut(&key) {
                        *slot = Some(id);
                    }
                }
            };
            let on_error = {
                let subscriber = subscriber.clone();
                move |error: E| subscriber.error(error)
            };
            let on_complete = {
                let state = state.clone();
                let subscriber = subscriber.clone();
                move || {
                    let finished = {
                        let mut state = state.lock();
                        state.upstream_done = true;
                        state.in_flight == 0
                    };
                    if finished {
                        subscriber.complete();
                    }
                }
            };

            let inner = upstream.subscribe(
                PartialObserver::new()
                    .on_next(on_next)
                    .on_error(on_error)
                    .on_complete(on_complete),
            );
            subscriber.subscription().add(inner);
        })
    }
}

struct DelayState {
    in_flight: usize,
    upstream_done: bool,
    next_key: u64,
    /// Timeouts not yet fired, keyed by emission.
    pending: BTreeMap<u64, Option<TimerId>>,
}

/// Synchronously read the first event `source` delivers on subscription.
///
/// Subscribes, records the first event, then unsubscribes. A completion without a
/// value reads as [`Rejection::Empty`]; `None` means nothing was delivered
/// synchronously.
pub fn get_immediate<T, E>(source: &Observable<T, E>) -> Option<Result<T, Rejection<E>>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let result: Arc<Mutex<Option<Result<T, Rejection<E>>>>> = Arc::new(Mutex::new(None));

    let record = |result: &Arc<Mutex<Option<Result<T, Rejection<E>>>>>,
                  outcome: Result<T, Rejection<E>>| {
        let mut slot = result.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
    };

    let on_next = {
        let result = result.clone();
        move |value| record(&result, Ok(value))
    };
    let on_error = {
        let result = result.clone();
        move |error| record(&result, Err(Rejection::Source(error)))
    };
    let on_complete = {
        let result = result.clone();
        move || record(&result, Err(Rejection::Empty(crate::EmptyValueError)))
    };

    source
        .subscribe(
            PartialObserver::new()
                .on_next(on_next)
                .on_error(on_error)
                .on_complete(on_complete),
        )
        .unsubscribe();

    let outcome = result.lock().take();
    outcome
}

/// Whether `source` completes synchronously without emitting a value.
pub fn is_immediate_completed<T, E>(source: &Observable<T, E>) -> bool
where
    T: Send + 'static,
    E: Send + 'static,
{
    matches!(get_immediate(source), Some(Err(Rejection::Empty(_))))
}
