//! Host event emitter handed to store subscriptions and callbacks.

use flume::Sender;

/// Events processed by a [`Host`](crate::Host) run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Something the component reads changed; render again.
    Invalidate,
    /// Tear the component down and stop the run loop.
    Unmount,
}

/// Queues [`HostEvent`]s for the host that created it.
///
/// `Emitter` wraps a lock-free channel sender, making it cheap to clone and safe to
/// capture in store change callbacks. Events are processed in order by the host;
/// several invalidations queued together produce a single render.
pub struct Emitter(pub(crate) Sender<HostEvent>);

impl Clone for Emitter {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Emitter {
    pub(crate) fn new(sender: Sender<HostEvent>) -> Self {
        Self(sender)
    }

    /// Request a render.
    pub fn invalidate(&self) {
        self.0.send(HostEvent::Invalidate).ok();
    }

    /// Request the component be unmounted.
    pub fn unmount(&self) {
        self.0.send(HostEvent::Unmount).ok();
    }
}
