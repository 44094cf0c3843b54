//! Rejection reasons surfaced by promises derived from sources and cancelable operations.

use thiserror::Error;

/// A source completed without emitting a value under a policy that required one.
///
/// Recoverable through [`Policy::with_initial`](crate::Policy::with_initial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("source completed without emitting a value")]
pub struct EmptyValueError;

/// The distinguished outcome of explicit cancellation.
///
/// Produced by [`Cancelable::cancel`](crate::Cancelable::cancel) and by disposing the
/// subscription behind a [`PromiseSubscribed`](crate::PromiseSubscribed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation was canceled")]
pub struct CanceledError;

/// Why a promise-like result rejected.
///
/// `E` is the error type of the upstream source or of the operation's own
/// `reject` calls; the other two variants are produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection<E> {
    #[error(transparent)]
    Empty(#[from] EmptyValueError),
    #[error(transparent)]
    Canceled(#[from] CanceledError),
    #[error("source error: {0}")]
    Source(E),
}

impl<E> Rejection<E> {
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Rejection::Empty(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Rejection::Canceled(_))
    }

    /// The upstream error, if this rejection carries one.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            Rejection::Source(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_source_error(self) -> Option<E> {
        match self {
            Rejection::Source(error) => Some(error),
            _ => None,
        }
    }
}
