//! Macrotask timers for delay-backed producers and operations.

use std::sync::Arc;
use std::time::Duration;

use spin::Mutex;

/// Identifies a scheduled timeout for [`Timer::clear_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Callback executed when a timeout elapses.
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// A source of timeouts on the host's cooperative task queue.
///
/// Implementations must never run a callback from inside [`set_timeout`](Self::set_timeout)
/// itself, and must never run a callback after it was cleared.
pub trait Timer: Send + Sync {
    /// Schedule `callback` to run once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancel a scheduled timeout. Clearing an elapsed or unknown id does nothing.
    fn clear_timeout(&self, id: TimerId);
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        (**self).set_timeout(delay, callback)
    }

    fn clear_timeout(&self, id: TimerId) {
        (**self).clear_timeout(id)
    }
}

struct Scheduled {
    id: TimerId,
    due: Duration,
    callback: TimerCallback,
}

struct VirtualTimerState {
    now: Duration,
    next_id: u64,
    scheduled: Vec<Scheduled>,
}

/// Deterministic timer driven by explicit calls to [`advance`](Self::advance).
///
/// Time only moves when the owner advances it, which makes it suitable both as a
/// frame clock driven by a host loop and for tests. Callbacks with the same due
/// time run in scheduling order.
///
/// # Example
///
/// ```rust
/// use oxide_rx::{Timer, VirtualTimer};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let timer = VirtualTimer::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = fired.clone();
/// timer.set_timeout(Duration::from_millis(10), Box::new(move || flag.store(true, Ordering::SeqCst)));
///
/// timer.advance(Duration::from_millis(9));
/// assert!(!fired.load(Ordering::SeqCst));
/// timer.advance(Duration::from_millis(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Clone)]
pub struct VirtualTimer {
    state: Arc<Mutex<VirtualTimerState>>,
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualTimerState {
                now: Duration::ZERO,
                next_id: 0,
                scheduled: Vec::new(),
            })),
        }
    }

    /// Elapsed virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timeouts not yet run or cleared.
    pub fn pending(&self) -> usize {
        self.state.lock().scheduled.len()
    }

    /// Move time forward by `by`, running every timeout that becomes due.
    ///
    /// Timeouts scheduled by callbacks run in the same call if they fall due
    /// within the window.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        while let Some(callback) = self.pop_due(Some(target)) {
            callback();
        }
        self.state.lock().now = target;
    }

    /// Run timeouts until none remain, moving time to each one's due point.
    pub fn run_all(&self) {
        while let Some(callback) = self.pop_due(None) {
            callback();
        }
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<TimerCallback> {
        let mut state = self.state.lock();
        let index = state
            .scheduled
            .iter()
            .enumerate()
            .min_by_key(|(_, scheduled)| (scheduled.due, scheduled.id))
            .map(|(index, _)| index)?;

        let due = state.scheduled[index].due;
        if limit.is_some_and(|limit| due > limit) {
            return None;
        }
        let scheduled = state.scheduled.remove(index);
        state.now = state.now.max(due);
        Some(scheduled.callback)
    }
}

impl Timer for VirtualTimer {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut state = self.state.lock();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let due = state.now + delay;
        state.scheduled.push(Scheduled { id, due, callback });
        log::trace!("scheduled timeout {id:?} due at {due:?}");
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let removed = {
            let mut state = self.state.lock();
            let index = state.scheduled.iter().position(|scheduled| scheduled.id == id);
            index.map(|index| state.scheduled.remove(index))
        };
        if removed.is_some() {
            log::trace!("cleared timeout {id:?}");
        }
    }
}
