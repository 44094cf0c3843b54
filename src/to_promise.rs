//! Convert push-based sources into single-settlement results through pluggable policies.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::Arc;

use spin::Mutex;

use crate::{
    deferred, CanceledError, EmptyValueError, Observable, PartialObserver, Promise, Rejection,
    Settle, Subscription,
};

type PolicyFn<T, U, E> = dyn Fn(&Observable<T, E>, Settle<U, E>) -> Subscription + Send + Sync;

/// Strategy turning a source's emissions into one settlement.
///
/// A policy subscribes to the source, settles through the given [`Settle`] and
/// returns the live [`Subscription`] synchronously. Clones share state, which
/// matters for [`Policy::throttle`].
///
/// # Example
///
/// ```rust
/// use oxide_rx::{to_promise, Observable, Policy};
///
/// let source = Observable::<&str, ()>::of(vec!["a", "b"]);
///
/// let last = to_promise(&source, &Policy::last());
/// assert_eq!(futures::executor::block_on(last), Ok("b"));
///
/// let first = to_promise(&source, &Policy::first());
/// assert_eq!(futures::executor::block_on(first), Ok("a"));
/// ```
pub struct Policy<T, U, E> {
    subscribe: Arc<PolicyFn<T, U, E>>,
}

impl<T, U, E> Clone for Policy<T, U, E> {
    fn clone(&self) -> Self {
        Self {
            subscribe: self.subscribe.clone(),
        }
    }
}

impl<T, U, E> Policy<T, U, E>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
{
    pub fn new(
        subscribe: impl Fn(&Observable<T, E>, Settle<U, E>) -> Subscription + Send + Sync + 'static,
    ) -> Self {
        Self {
            subscribe: Arc::new(subscribe),
        }
    }

    pub fn subscribe(&self, source: &Observable<T, E>, settle: Settle<U, E>) -> Subscription {
        (self.subscribe)(source, settle)
    }

    /// Resolve with `initial` when `inner` rejects with [`EmptyValueError`].
    ///
    /// Every other rejection propagates unchanged.
    pub fn with_initial(initial: U, inner: Policy<T, U, E>) -> Self
    where
        U: Clone + Sync,
    {
        Self::new(move |source, settle| {
            let initial = initial.clone();
            let intercepted = Settle::new(move |outcome: Result<U, Rejection<E>>| match outcome {
                Err(Rejection::Empty(_)) => settle.resolve(initial.clone()),
                outcome => settle.settle(outcome),
            });
            inner.subscribe(source, intercepted)
        })
    }

    /// Keep at most one in-flight subscription per policy instance.
    ///
    /// Each call first disposes the subscription returned by the previous call, so
    /// the latest call wins. The superseded result rejects with
    /// [`Rejection::Canceled`] when it was obtained through [`to_promise`].
    pub fn throttle(inner: Policy<T, U, E>) -> Self {
        let current: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        Self::new(move |source, settle| {
            let previous = current.lock().take();
            if let Some(previous) = previous {
                if !previous.is_closed() {
                    log::debug!("superseding in-flight subscription");
                }
                previous.unsubscribe();
            }
            let subscription = inner.subscribe(source, settle);
            *current.lock() = Some(subscription.clone());
            subscription
        })
    }

    /// Transform the resolved value.
    pub fn map<V>(self, project: impl Fn(U) -> V + Send + Sync + 'static) -> Policy<T, V, E>
    where
        V: Send + 'static,
    {
        let project = Arc::new(project);
        Policy::new(move |source, settle: Settle<V, E>| {
            let project = project.clone();
            let mapped = Settle::new(move |outcome: Result<U, Rejection<E>>| {
                settle.settle(outcome.map(|value| project(value)))
            });
            self.subscribe(source, mapped)
        })
    }
}

impl<T, E> Policy<T, T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Resolve with the first value.
    ///
    /// Rejects with [`EmptyValueError`] if the source completes first, and with the
    /// source's error if it fails first.
    pub fn first() -> Self {
        Self::new(|source, settle| {
            let on_next = settle.clone();
            let on_error = settle.clone();
            source.subscribe(
                PartialObserver::new()
                    .on_next(move |value| on_next.resolve(value))
                    .on_error(move |error| on_error.reject(error))
                    .on_complete(move || settle.reject_with(EmptyValueError.into())),
            )
        })
    }

    /// Resolve with the most recent value once the source completes.
    ///
    /// Rejects with [`EmptyValueError`] if the source completes without emitting, and
    /// with the source's error as soon as it fails.
    pub fn last() -> Self {
        Self::new(|source, settle| {
            let latest: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
            let store = latest.clone();
            let on_error = settle.clone();
            source.subscribe(
                PartialObserver::new()
                    .on_next(move |value| *store.lock() = Some(value))
                    .on_error(move |error| on_error.reject(error))
                    .on_complete(move || {
                        let value = latest.lock().take();
                        match value {
                            Some(value) => settle.resolve(value),
                            None => settle.reject_with(EmptyValueError.into()),
                        }
                    }),
            )
        })
    }
}

impl<T, E> Policy<T, Option<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// The last value if any, `None` if the source completes empty.
    pub fn default_subscriber() -> Self {
        Policy::with_initial(None, Policy::last().map(Some))
    }
}

/// Promise-like result of [`to_promise`], carrying the live subscription.
///
/// Canceling closes the subscription synchronously. Closing the subscription by any
/// other route rejects the result with [`Rejection::Canceled`] unless it already
/// settled.
pub struct PromiseSubscribed<U, E> {
    promise: Promise<U, E>,
    subscription: Subscription,
}

impl<U, E> PromiseSubscribed<U, E> {
    /// The subscription returned by the policy. Children added to it are disposed with it.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn cancel(&self) {
        self.subscription.unsubscribe();
    }
}

impl<U, E> Future for PromiseSubscribed<U, E> {
    type Output = Result<U, Rejection<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.promise).poll(cx)
    }
}

/// Subscribe `policy` to `source` and expose its settlement as a future.
pub fn to_promise<T, U, E>(source: &Observable<T, E>, policy: &Policy<T, U, E>) -> PromiseSubscribed<U, E>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
{
    let (settle, promise) = deferred();
    let subscription = policy.subscribe(source, settle.clone());
    subscription.add_teardown(move || settle.reject_with(CanceledError.into()));

    PromiseSubscribed {
        promise,
        subscription,
    }
}

/// [`to_promise`] with [`Policy::default_subscriber`].
pub fn to_promise_default<T, E>(source: &Observable<T, E>) -> PromiseSubscribed<Option<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    to_promise(source, &Policy::default_subscriber())
}
