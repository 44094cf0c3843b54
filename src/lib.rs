//! Reactive stores, cancelable results and push-source hooks for component renderers.
//!
//! Bridges push-based sources ([`Observable`], [`Subject`], [`BehaviorSubject`]) to
//! synchronously rendered components:
//!
//! - [`RxStore`] is a single-slot value cell that components read on every render and
//!   that notifies them when it changes.
//! - [`to_promise`] turns a source into one settlement through a [`Policy`], and
//!   [`cancelable`] wraps any callback-style operation so it can be canceled.
//! - [`Subscription`] is the revocable handle tying all of it to component lifetimes.
//! - A [`Host`] renders a [`Component`], whose hooks ([`use_rx_state`],
//!   [`use_rx_value`], [`use_rx_callback`], ...) keep stores and subscriptions in sync
//!   with its mounts, re-renders and unmount.
//!
//! ## Example
//!
//! ```rust
//! use oxide_rx::{
//!     use_rx_callback, use_rx_state, Dispatcher, Observable, RenderContext, RxCallback,
//!     Renderer, StoreInput, TestHost,
//! };
//! use std::convert::Infallible;
//!
//! #[derive(Clone)]
//! struct Props {
//!     count: i32,
//!     set_count: Dispatcher<i32>,
//!     load: RxCallback<i32, i32, Option<i32>, Infallible>,
//! }
//!
//! fn counter(cx: &mut RenderContext) -> Props {
//!     let (count, set_count, _store) = use_rx_state::<i32, Infallible>(cx, StoreInput::Value(0));
//!     let load = use_rx_callback(cx, |by: i32| Observable::<i32, Infallible>::of(vec![by * 2]), oxide_rx::deps![]);
//!     Props { count, set_count, load }
//! }
//!
//! struct PrintRenderer;
//! impl Renderer<Props> for PrintRenderer {
//!     fn render(&mut self, props: Props) {
//!         println!("count = {}", props.count);
//!     }
//! }
//!
//! let renderer = oxide_rx::TestRenderer::new();
//! let mut driver = TestHost::new(counter, renderer.clone()).run();
//!
//! let props = renderer.with_latest(Props::clone);
//! if let Some(props) = props {
//!     props.set_count.dispatch(5);
//!     let loaded = futures::executor::block_on(props.load.call(21));
//!     assert_eq!(loaded, Ok(Some(42)));
//! }
//! driver.process_events();
//!
//! assert_eq!(renderer.with_latest(|props| props.count), Some(5));
//! # let _ = PrintRenderer;
//! ```

// Module declarations
mod binding;
mod cancelable;
mod component;
mod context;
mod deps;
mod effect;
mod emitter;
mod error;
mod hooks;
mod observable;
mod renderer;
mod runtime;
mod store;
mod subject;
mod subscription;
mod timer;
mod to_promise;

// Public re-exports
pub use binding::StreamBinding;
pub use cancelable::{
    async_delay, cancelable, deferred, CancelHandle, CancelState, Cancelable, Promise, Settle,
};
pub use component::Component;
pub use context::{RenderContext, StateSetter};
pub use deps::{Dep, DepValue, Deps, DepsTracker};
pub use effect::Cleanup;
pub use emitter::{Emitter, HostEvent};
pub use error::{CanceledError, EmptyValueError, Rejection};
pub use hooks::{
    use_const_callback, use_event_state, use_rx_callback, use_rx_callback_with, use_rx_event_store,
    use_rx_event_store_with, use_rx_state, use_rx_store, use_rx_store_dispatcher,
    use_rx_store_value, use_rx_subscription, use_rx_subscription_with, use_rx_value,
    use_set_state_dispatcher, ConstCallback, Dispatcher, Handler, RxCallback,
};
pub use observable::{
    get_immediate, is_immediate_completed, Observable, Observer, PartialObserver, Subscriber,
};
pub use renderer::Renderer;
pub use runtime::Host;
pub use store::{create_store, ExternalStore, RxStore, SetState, StoreInput};
pub use subject::{BehaviorSubject, Subject};
pub use subscription::{Subscription, Teardown};
pub use timer::{Timer, TimerCallback, TimerId, VirtualTimer};
pub use to_promise::{to_promise, to_promise_default, Policy, PromiseSubscribed};

// Test utilities (only available with 'testing' feature or during tests)
#[cfg(any(test, feature = "testing"))]
pub use renderer::TestRenderer;
#[cfg(any(test, feature = "testing"))]
pub use runtime::{TestHost, TestHostDriver};
