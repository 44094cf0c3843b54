//! Dependency lists gating recomputation across renders.

use core::any::Any;
use std::sync::Arc;

/// A type-erased dependency value compared with its own `PartialEq`.
///
/// Types whose equality is identity (such as [`RxStore`](crate::RxStore) or
/// [`Subscription`](crate::Subscription)) compare by identity; plain values compare by
/// value. Values of different types are never equal.
pub trait DepValue: Any + Send + Sync {
    fn dyn_eq(&self, other: &dyn DepValue) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + Send + Sync + 'static> DepValue for T {
    fn dyn_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One position of a dependency list.
pub struct Dep(Box<dyn DepValue>);

impl Dep {
    pub fn new<T: PartialEq + Send + Sync + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Dependency on the identity of an `Arc`, ignoring its contents.
    pub fn ptr<T: ?Sized>(value: &Arc<T>) -> Self {
        Self::new(Arc::as_ptr(value).cast::<()>() as usize)
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        (*self.0).dyn_eq(&*other.0)
    }
}

/// Ordered dependency list. Equal only if lengths match and every position is equal.
///
/// Built with the [`deps!`](crate::deps) macro.
#[derive(Default, PartialEq)]
pub struct Deps(Vec<Dep>);

impl Deps {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with<T: PartialEq + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.0.push(Dep::new(value));
        self
    }

    pub fn push(&mut self, dep: Dep) {
        self.0.push(dep);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build a [`Deps`] list from expressions.
///
/// ```rust
/// use oxide_rx::deps;
///
/// assert!(deps![1, "a"] == deps![1, "a"]);
/// assert!(deps![1, "a"] != deps![1, "b"]);
/// assert!(deps![1] != deps![1, 1]);
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($dep:expr),+ $(,)?) => {
        $crate::Deps::new()$(.with($dep))+
    };
}

/// Remembers the last-seen dependency list.
#[derive(Default)]
pub struct DepsTracker {
    last: Option<Deps>,
}

impl DepsTracker {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Record `next`, returning whether it differs from the previous list.
    ///
    /// The first call always reports a change.
    pub fn changed(&mut self, next: Deps) -> bool {
        match &self.last {
            Some(previous) if *previous == next => false,
            _ => {
                self.last = Some(next);
                true
            }
        }
    }

    /// Forget the last list so the next comparison reports a change.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
