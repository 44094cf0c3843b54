//! Hooks bridging stores, push sources and cancelable calls into a component.
//!
//! Every hook takes the component's [`RenderContext`] first and must be called in the
//! same order on every render.

use std::fmt;
use std::sync::Arc;

use spin::Mutex;

use crate::context::HookSlot;
use crate::store::{resolve_store, Ownership};
use crate::{
    deps, to_promise, Cleanup, Deps, Observable, Observer, PartialObserver, Policy,
    PromiseSubscribed, RenderContext, RxStore, SetState, StoreInput, StreamBinding, Subscription,
};

/// Shared event handler returned by the event hooks.
pub type Handler<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Identity of a shared closure, ignoring its vtable.
fn fn_addr<F: ?Sized>(f: &Arc<F>) -> *const () {
    Arc::as_ptr(f).cast::<()>()
}

/// Callback with a stable identity that always invokes the latest closure.
///
/// Returned by [`use_const_callback`]. Equality is identity.
pub struct ConstCallback<A, R> {
    current: Arc<Mutex<Arc<dyn Fn(A) -> R + Send + Sync>>>,
}

impl<A, R> Clone for ConstCallback<A, R> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
        }
    }
}

impl<A, R> PartialEq for ConstCallback<A, R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl<A, R> fmt::Debug for ConstCallback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstCallback").finish_non_exhaustive()
    }
}

impl<A, R> ConstCallback<A, R> {
    pub fn call(&self, args: A) -> R {
        let current = self.current.lock().clone();
        current(args)
    }
}

/// Stable callback forwarding to the closure passed on the most recent render.
pub fn use_const_callback<A, R>(
    cx: &mut RenderContext,
    callback: impl Fn(A) -> R + Send + Sync + 'static,
) -> ConstCallback<A, R>
where
    A: 'static,
    R: 'static,
{
    let latest: Arc<dyn Fn(A) -> R + Send + Sync> = Arc::new(callback);
    let initial = latest.clone();
    let holder = cx.use_const(move || ConstCallback {
        current: Arc::new(Mutex::new(initial)),
    });
    *holder.current.lock() = latest;
    holder
}

/// Setter accepting either a value or a modifier of the current value.
///
/// Returned by [`use_set_state_dispatcher`] and the store hooks. Equality is identity,
/// so a dispatcher can itself be a dependency.
pub struct Dispatcher<T> {
    get: Arc<dyn Fn() -> T + Send + Sync>,
    set: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<T> PartialEq for Dispatcher<T> {
    fn eq(&self, other: &Self) -> bool {
        fn_addr(&self.get) == fn_addr(&other.get) && fn_addr(&self.set) == fn_addr(&other.set)
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<T> Dispatcher<T> {
    pub fn dispatch(&self, action: impl Into<SetState<T>>) {
        let next = action.into().resolve(|| (self.get)());
        (self.set)(next);
    }

    pub fn set(&self, value: T) {
        (self.set)(value);
    }

    pub fn update(&self, modifier: impl FnOnce(&T) -> T) {
        let next = modifier(&(self.get)());
        (self.set)(next);
    }
}

/// Dispatcher over `get`/`set`, rebuilt only when `deps` change.
pub fn use_set_state_dispatcher<T: 'static>(
    cx: &mut RenderContext,
    get: impl Fn() -> T + Send + Sync + 'static,
    set: impl Fn(T) + Send + Sync + 'static,
    deps: Deps,
) -> Dispatcher<T> {
    cx.use_memo(deps, move || Dispatcher {
        get: Arc::new(get),
        set: Arc::new(set),
    })
}

/// Local state updated through an event handler applying `project` to its argument.
///
/// The handler is rebuilt only when `deps` change.
pub fn use_event_state<A, T>(
    cx: &mut RenderContext,
    initial: impl FnOnce() -> T,
    project: impl Fn(A) -> T + Send + Sync + 'static,
    deps: Deps,
) -> (T, Handler<A>)
where
    A: 'static,
    T: Clone + Send + 'static,
{
    let (value, setter) = cx.use_state(initial);
    let handler = cx.use_memo(deps, move || -> Handler<A> {
        Arc::new(move |args: A| setter.set(project(args)))
    });
    (value, handler)
}

/// Store created from `input` on the first render and kept for the component's lifetime.
///
/// `input` is only consulted on the first render. A store created here, including one
/// wrapping a supplied subject or replacing a terminated source, is completed when the
/// component unmounts. A store supplied by the caller is left untouched.
pub fn use_rx_store<T, E>(cx: &mut RenderContext, input: StoreInput<T, E>) -> RxStore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (store, ownership) = cx.use_const(move || resolve_store(input));
    let owned = store.clone();
    cx.use_render_effect(deps![store.clone()], move || match ownership {
        Ownership::Owned => Some(Cleanup::new(move || {
            log::debug!("completing store owned by unmounted component");
            owned.complete();
        })),
        Ownership::Borrowed => None,
    });
    store
}

/// Current value of `store`; the component renders again when it changes.
pub fn use_rx_store_value<T, E>(cx: &mut RenderContext, store: &RxStore<T, E>) -> T
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    cx.use_sync_external_store(store)
}

/// Dispatcher writing into `store`.
pub fn use_rx_store_dispatcher<T, E>(cx: &mut RenderContext, store: &RxStore<T, E>) -> Dispatcher<T>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let getter = store.clone();
    let setter = store.clone();
    use_set_state_dispatcher(
        cx,
        move || getter.get_value(),
        move |value| setter.next(value),
        deps![store.clone()],
    )
}

/// [`use_rx_store`], [`use_rx_store_value`] and [`use_rx_store_dispatcher`] combined.
pub fn use_rx_state<T, E>(
    cx: &mut RenderContext,
    input: StoreInput<T, E>,
) -> (T, Dispatcher<T>, RxStore<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let store = use_rx_store(cx, input);
    let value = use_rx_store_value(cx, &store);
    let dispatcher = use_rx_store_dispatcher(cx, &store);
    (value, dispatcher, store)
}

/// Store plus a handler pushing each event into it unchanged.
pub fn use_rx_event_store<T, E>(cx: &mut RenderContext, input: StoreInput<T, E>) -> (RxStore<T, E>, Handler<T>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    use_rx_event_store_with(cx, input, |event: T| event, deps![])
}

/// Store plus a handler pushing `project(event)` into it.
///
/// The handler is rebuilt when `deps` change.
pub fn use_rx_event_store_with<A, T, E>(
    cx: &mut RenderContext,
    input: StoreInput<T, E>,
    project: impl Fn(A) -> T + Send + Sync + 'static,
    deps: Deps,
) -> (RxStore<T, E>, Handler<A>)
where
    A: 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let store = use_rx_store(cx, input);
    let events = store.clone();
    let handler = cx.use_memo(deps.with(store.clone()), move || -> Handler<A> {
        Arc::new(move |args: A| events.next(project(args)))
    });
    (store, handler)
}

struct BindingSlot(StreamBinding);

impl HookSlot for BindingSlot {
    fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
        self
    }

    fn teardown(&mut self) {
        self.0.dispose();
    }
}

/// Keep the source produced by `source` subscribed, for its side effects only.
///
/// Resubscribes when `deps` change, disposing the previous subscription first. The
/// subscription is disposed at unmount.
pub fn use_rx_subscription<T, E, S>(cx: &mut RenderContext, source: impl FnOnce() -> S, deps: Deps)
where
    T: Send + 'static,
    E: Send + 'static,
    S: Into<Observable<T, E>>,
{
    use_rx_subscription_with(cx, source, deps, PartialObserver::<T, E>::new, Deps::new());
}

/// Like [`use_rx_subscription`], delivering to the observer built by `observer`.
///
/// A change in either dependency list resubscribes.
pub fn use_rx_subscription_with<T, E, S, O>(
    cx: &mut RenderContext,
    source: impl FnOnce() -> S,
    source_deps: Deps,
    observer: impl FnOnce() -> O,
    observer_deps: Deps,
) where
    T: Send + 'static,
    E: Send + 'static,
    S: Into<Observable<T, E>>,
    O: Observer<T, E> + 'static,
{
    let slot = cx.slot(|| BindingSlot(StreamBinding::new()));
    slot.0.bind(source_deps, source, observer_deps, observer);
}

/// Latest value emitted by the source produced by `source`, `None` before the first.
///
/// Resubscribes when `deps` change. Values replayed synchronously on subscription are
/// visible in the same render.
pub fn use_rx_value<T, E, S>(cx: &mut RenderContext, source: impl FnOnce() -> S, deps: Deps) -> Option<T>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
    S: Into<Observable<T, E>>,
{
    let store = use_rx_store(cx, StoreInput::<Option<T>>::Value(None));
    let sink = store.clone();
    use_rx_subscription_with(
        cx,
        source,
        deps,
        move || PartialObserver::<T, E>::new().on_next(move |value| sink.next(Some(value))),
        deps![store.clone()],
    );
    use_rx_store_value(cx, &store)
}

type SourceFactory<A, T, E> = dyn Fn(A) -> Observable<T, E> + Send + Sync;

/// Callback turning each call's source into a [`PromiseSubscribed`].
///
/// Returned by [`use_rx_callback`]. Every result's subscription is a child of one
/// component-scoped subscription, disposed at unmount, which rejects unsettled results
/// with [`Rejection::Canceled`](crate::Rejection::Canceled).
pub struct RxCallback<A, T, U, E> {
    factory: Arc<SourceFactory<A, T, E>>,
    policy: Policy<T, U, E>,
    parent: Subscription,
}

impl<A, T, U, E> Clone for RxCallback<A, T, U, E> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            policy: self.policy.clone(),
            parent: self.parent.clone(),
        }
    }
}

impl<A, T, U, E> PartialEq for RxCallback<A, T, U, E> {
    fn eq(&self, other: &Self) -> bool {
        fn_addr(&self.factory) == fn_addr(&other.factory) && self.parent.ptr_eq(&other.parent)
    }
}

impl<A, T, U, E> fmt::Debug for RxCallback<A, T, U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxCallback")
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl<A, T, U, E> RxCallback<A, T, U, E>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
{
    pub fn call(&self, args: A) -> PromiseSubscribed<U, E> {
        let source = (self.factory)(args);
        let promise = to_promise(&source, &self.policy);
        self.parent.add(promise.subscription().clone());
        promise
    }
}

/// [`use_rx_callback_with`] using `Policy::throttle(Policy::default_subscriber())`:
/// the latest call wins and an empty source resolves with `None`.
pub fn use_rx_callback<A, T, E, S>(
    cx: &mut RenderContext,
    factory: impl Fn(A) -> S + Send + Sync + 'static,
    deps: Deps,
) -> RxCallback<A, T, Option<T>, E>
where
    A: 'static,
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    S: Into<Observable<T, E>>,
{
    use_rx_callback_with(cx, factory, deps, || Policy::throttle(Policy::default_subscriber()))
}

/// Callback building a source from its arguments and settling it through a policy.
///
/// `factory` is replaced only when `deps` change. `policy` runs once, on the first
/// render; the policy instance is shared by every call, which is what lets
/// [`Policy::throttle`] supersede earlier calls.
pub fn use_rx_callback_with<A, T, U, E, S>(
    cx: &mut RenderContext,
    factory: impl Fn(A) -> S + Send + Sync + 'static,
    deps: Deps,
    policy: impl FnOnce() -> Policy<T, U, E>,
) -> RxCallback<A, T, U, E>
where
    A: 'static,
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    S: Into<Observable<T, E>>,
{
    let factory = cx.use_memo(deps, move || -> Arc<SourceFactory<A, T, E>> {
        Arc::new(move |args: A| -> Observable<T, E> { factory(args).into() })
    });
    let policy = cx.use_const(policy);

    let parent = cx.use_const(Subscription::new);
    let disposed = parent.clone();
    cx.use_render_effect(deps![parent.clone()], move || Some(Cleanup::unsubscribe(disposed)));

    RxCallback {
        factory,
        policy,
        parent,
    }
}
