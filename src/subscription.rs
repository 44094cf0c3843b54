//! Revocable handles for active producer/consumer relationships.

use std::fmt;
use std::sync::{Arc, Weak};

use spin::Mutex;

/// Work executed exactly once when a [`Subscription`] is disposed.
pub type Teardown = Box<dyn FnOnce() + Send>;

enum Finalizer {
    Teardown(Teardown),
    Child(Subscription),
}

struct SubscriptionState {
    closed: bool,
    finalizers: Vec<Finalizer>,
}

/// Handle representing "this producer is currently delivering values to this consumer".
///
/// Disposal through [`unsubscribe`](Self::unsubscribe) is idempotent: the first call
/// runs every registered teardown and disposes every child exactly once, later calls
/// do nothing. Anything added to an already closed subscription is disposed
/// immediately.
///
/// Clones share the same underlying handle. Dropping a clone does not dispose it.
///
/// # Example
///
/// ```rust
/// use oxide_rx::Subscription;
///
/// let parent = Subscription::new();
/// let child = Subscription::new();
/// parent.add(child.clone());
///
/// parent.unsubscribe();
/// assert!(child.is_closed());
/// ```
#[derive(Clone)]
pub struct Subscription {
    state: Arc<Mutex<SubscriptionState>>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subscription")
            .field("closed", &state.closed)
            .field("finalizers", &state.finalizers.len())
            .finish()
    }
}

impl Subscription {
    /// Create an open subscription with nothing attached.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubscriptionState {
                closed: false,
                finalizers: Vec::new(),
            })),
        }
    }

    /// Create an open subscription that runs `teardown` when disposed.
    pub fn from_teardown(teardown: impl FnOnce() + Send + 'static) -> Self {
        let subscription = Self::new();
        subscription.add_teardown(teardown);
        subscription
    }

    /// Whether this subscription has been disposed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether both handles refer to the same subscription.
    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Register `teardown` to run when this subscription is disposed.
    ///
    /// Runs immediately if the subscription is already closed.
    pub fn add_teardown(&self, teardown: impl FnOnce() + Send + 'static) {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            teardown();
            return;
        }
        state.finalizers.push(Finalizer::Teardown(Box::new(teardown)));
    }

    /// Attach `child` so that disposing this subscription also disposes it.
    ///
    /// A child that is disposed on its own detaches itself from this parent. Adding a
    /// subscription to itself or adding an already closed child does nothing.
    pub fn add(&self, child: Subscription) {
        if self.ptr_eq(&child) || child.is_closed() {
            return;
        }

        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            child.unsubscribe();
            return;
        }
        let attached = state.finalizers.iter().any(|finalizer| {
            matches!(finalizer, Finalizer::Child(existing) if existing.ptr_eq(&child))
        });
        if attached {
            return;
        }
        state.finalizers.push(Finalizer::Child(child.clone()));
        drop(state);

        let parent = Arc::downgrade(&self.state);
        let detached = child.clone();
        child.add_teardown(move || detach(&parent, &detached));
    }

    /// Detach `child` without disposing it.
    pub fn remove(&self, child: &Subscription) {
        self.state.lock().finalizers.retain(|finalizer| match finalizer {
            Finalizer::Child(existing) => !existing.ptr_eq(child),
            Finalizer::Teardown(_) => true,
        });
    }

    /// Dispose this subscription, its teardowns and its children.
    pub fn unsubscribe(&self) {
        let finalizers = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            core::mem::take(&mut state.finalizers)
        };

        log::trace!("disposing subscription with {} finalizers", finalizers.len());
        for finalizer in finalizers {
            match finalizer {
                Finalizer::Teardown(teardown) => teardown(),
                Finalizer::Child(child) => child.unsubscribe(),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn finalizer_count(&self) -> usize {
        self.state.lock().finalizers.len()
    }
}

fn detach(parent: &Weak<Mutex<SubscriptionState>>, child: &Subscription) {
    if let Some(state) = parent.upgrade() {
        Subscription { state }.remove(child);
    }
}
