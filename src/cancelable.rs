//! Deferred results with first-settlement-wins semantics and explicit cancellation.

use core::convert::Infallible;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use spin::Mutex;

use crate::{CanceledError, Cleanup, Rejection, Timer};

type SettleFn<T, E> = dyn Fn(Result<T, Rejection<E>>) + Send + Sync;

/// Settles a deferred result. Clones settle the same result.
///
/// Only the first settlement is observed; every later call is ignored.
pub struct Settle<T, E> {
    settle: Arc<SettleFn<T, E>>,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            settle: self.settle.clone(),
        }
    }
}

impl<T, E> Settle<T, E> {
    /// Wrap a settlement callback.
    ///
    /// Useful to intercept outcomes before forwarding them to another `Settle`.
    pub fn new(settle: impl Fn(Result<T, Rejection<E>>) + Send + Sync + 'static) -> Self {
        Self {
            settle: Arc::new(settle),
        }
    }

    pub fn resolve(&self, value: T) {
        (self.settle)(Ok(value));
    }

    /// Reject with an upstream or application error.
    pub fn reject(&self, error: E) {
        (self.settle)(Err(Rejection::Source(error)));
    }

    pub fn reject_with(&self, rejection: Rejection<E>) {
        (self.settle)(Err(rejection));
    }

    pub fn settle(&self, outcome: Result<T, Rejection<E>>) {
        (self.settle)(outcome);
    }
}

/// Awaitable side of a deferred result.
///
/// Resolves to the first outcome passed to its [`Settle`]. If every `Settle` is
/// dropped without settling, it rejects with [`Rejection::Canceled`].
pub struct Promise<T, E> {
    receiver: oneshot::Receiver<Result<T, Rejection<E>>>,
}

impl<T, E> Future for Promise<T, E> {
    type Output = Result<T, Rejection<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(CanceledError.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create a deferred result and the handle that settles it.
pub fn deferred<T, E>() -> (Settle<T, E>, Promise<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let sender = Mutex::new(Some(sender));
    let settle = Settle::new(move |outcome| {
        let sender = sender.lock().take();
        if let Some(sender) = sender {
            sender.send(outcome).ok();
        }
    });
    (settle, Promise { receiver })
}

/// Read-only view of whether cancellation was requested.
#[derive(Clone, Debug, Default)]
pub struct CancelState {
    canceled: Arc<AtomicBool>,
}

impl CancelState {
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

struct CancelInner {
    state: CancelState,
    on_cancel: Mutex<Option<Cleanup>>,
    reject: Box<dyn Fn() + Send + Sync>,
}

/// Requests cancellation of a [`Cancelable`]. Clones cancel the same operation.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    /// Cancel the operation.
    ///
    /// The first call flips the cancel state, runs the executor's cleanup and rejects
    /// the result with [`Rejection::Canceled`] unless it already settled. Later calls
    /// do nothing.
    pub fn cancel(&self) {
        if self.inner.state.canceled.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("canceling operation");

        let on_cancel = self.inner.on_cancel.lock().take();
        if let Some(on_cancel) = on_cancel {
            on_cancel.run();
        }
        (self.inner.reject)();
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.state.is_canceled()
    }
}

/// Awaitable, cancelable result of a [`cancelable`] executor.
pub struct Cancelable<T, E> {
    promise: Promise<T, E>,
    handle: CancelHandle,
}

impl<T, E> Cancelable<T, E> {
    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.handle.is_canceled()
    }

    /// A handle for canceling while this result is being awaited elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }
}

impl<T, E> Future for Cancelable<T, E> {
    type Output = Result<T, Rejection<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.promise).poll(cx)
    }
}

/// Run `executor` and wrap its outcome in a cancelable result.
///
/// The executor receives the [`Settle`] for the result and a [`CancelState`] it can
/// poll cooperatively. The [`Cleanup`] it returns runs exactly once, on the first
/// cancellation, and never on normal settlement.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{cancelable, Rejection};
///
/// let operation = cancelable::<i32, (), _>(|settle, _state| {
///     settle.resolve(5);
///     None
/// });
/// operation.cancel();
///
/// assert_eq!(futures::executor::block_on(operation), Ok(5));
/// ```
pub fn cancelable<T, E, F>(executor: F) -> Cancelable<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(Settle<T, E>, CancelState) -> Option<Cleanup>,
{
    let (settle, promise) = deferred();
    let state = CancelState::default();
    let on_cancel = executor(settle.clone(), state.clone());

    let handle = CancelHandle {
        inner: Arc::new(CancelInner {
            state,
            on_cancel: Mutex::new(on_cancel),
            reject: Box::new(move || settle.reject_with(CanceledError.into())),
        }),
    };

    Cancelable { promise, handle }
}

/// Resolve after `duration` on `timer`. Canceling clears the timeout.
pub fn async_delay<Tm>(timer: Tm, duration: Duration) -> Cancelable<(), Infallible>
where
    Tm: Timer + 'static,
{
    cancelable(move |settle, _state| {
        let id = timer.set_timeout(duration, Box::new(move || settle.resolve(())));
        Some(Cleanup::new(move || timer.clear_timeout(id)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualTimer;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn given_a_resolving_executor_should_resolve() {
        let operation = cancelable::<i32, i32, _>(|settle, _| {
            settle.resolve(5);
            None
        });

        assert_eq!(block_on(operation), Ok(5));
    }

    #[test]
    fn given_a_rejecting_executor_should_reject_with_source_error() {
        let operation = cancelable::<i32, i32, _>(|settle, _| {
            settle.reject(5);
            None
        });

        assert_eq!(block_on(operation), Err(Rejection::Source(5)));
    }

    #[test]
    fn given_a_pending_operation_when_canceled_should_reject_with_canceled() {
        let operation = cancelable::<i32, (), _>(|_, _| None);

        operation.cancel();

        assert_eq!(block_on(operation), Err(Rejection::Canceled(CanceledError)));
    }

    #[test]
    fn given_a_resolved_operation_when_canceled_should_keep_the_value() {
        let operation = cancelable::<i32, (), _>(|settle, _| {
            settle.resolve(1);
            None
        });

        operation.cancel();

        assert_eq!(block_on(operation), Ok(1));
    }

    #[test]
    fn given_a_cleanup_when_canceled_twice_should_run_it_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = runs.clone();
        let operation = cancelable::<(), (), _>(move |_, _| {
            Some(Cleanup::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }))
        });
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        operation.cancel();
        operation.cancel_handle().cancel();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_a_cancel_state_when_canceled_later_should_observe_the_flag() {
        let timer = VirtualTimer::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let log = observed.clone();
        let scheduler = timer.clone();
        let operation = cancelable::<(), (), _>(move |_, state| {
            log.lock().push(state.is_canceled());
            scheduler.set_timeout(
                Duration::from_millis(100),
                Box::new(move || log.lock().push(state.is_canceled())),
            );
            None
        });

        operation.cancel();
        timer.run_all();

        assert_eq!(*observed.lock(), vec![false, true]);
    }

    #[test]
    fn given_a_delay_when_canceled_before_elapsing_should_reject_and_clear_its_timer() {
        let timer = VirtualTimer::new();
        let delay = async_delay(timer.clone(), Duration::from_millis(100));
        timer.advance(Duration::from_millis(50));
        assert_eq!(timer.pending(), 1);

        delay.cancel();

        assert_eq!(timer.pending(), 0);
        assert_eq!(block_on(delay), Err(Rejection::Canceled(CanceledError)));
    }

    #[test]
    fn given_a_delay_when_elapsed_should_resolve() {
        let timer = VirtualTimer::new();
        let mut delay = async_delay(timer.clone(), Duration::from_millis(100));
        assert!((&mut delay).now_or_never().is_none());

        timer.advance(Duration::from_millis(100));

        assert_eq!(block_on(delay), Ok(()));
    }
}
