//! Cleanup work returned by render effects and cancelable executors.

use crate::Subscription;

/// Deferred cleanup, executed at most once.
///
/// Returned from [`RenderContext::use_render_effect`](crate::RenderContext::use_render_effect)
/// callbacks and from [`cancelable`](crate::cancelable) executors.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{Cleanup, Subscription};
///
/// let subscription = Subscription::new();
/// let cleanup = Cleanup::batch(vec![
///     Cleanup::unsubscribe(subscription.clone()),
///     Cleanup::new(|| println!("released")),
/// ]);
///
/// cleanup.run();
/// assert!(subscription.is_closed());
/// ```
pub struct Cleanup(Box<dyn FnOnce() + Send + 'static>);

impl Cleanup {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(cleanup))
    }

    /// Cleanup that disposes `subscription`.
    pub fn unsubscribe(subscription: Subscription) -> Self {
        Self::new(move || subscription.unsubscribe())
    }

    /// Combine several cleanups, run in order.
    pub fn batch(cleanups: Vec<Cleanup>) -> Self {
        Self::new(move || {
            for cleanup in cleanups {
                cleanup.run();
            }
        })
    }

    pub fn run(self) {
        (self.0)();
    }
}

impl From<Subscription> for Cleanup {
    fn from(subscription: Subscription) -> Self {
        Cleanup::unsubscribe(subscription)
    }
}
