//! Player status and the cell that publishes it
//!
//! Every change wakes all waiters, so the facade can block on any
//! predicate over the status without busy-waiting.

use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// Lifecycle and playback state of a [`StreamPlayer`](crate::StreamPlayer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Worker is starting up
    Init,
    /// Idle; a stream may be started
    Ready,
    /// A start was requested; the worker has not begun it yet
    Starting,
    /// Stream is audible
    Playing,
    /// A stop was requested
    Stopping,
    /// Shutdown requested
    Quit,
    /// Worker has exited
    Zombie,
    /// A queued start was requested
    Queueing,
    /// Stream is primed and waiting for `queue_go`
    Queued,
}

impl Status {
    /// A stream session is active or about to become active
    pub fn is_playing(self) -> bool {
        matches!(
            self,
            Status::Playing | Status::Starting | Status::Queueing | Status::Queued
        )
    }

    /// The worker is exiting or gone
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Quit | Status::Zombie)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Init => "init",
            Status::Ready => "ready",
            Status::Starting => "starting",
            Status::Playing => "playing",
            Status::Stopping => "stopping",
            Status::Quit => "quit",
            Status::Zombie => "zombie",
            Status::Queueing => "queueing",
            Status::Queued => "queued",
        };
        f.write_str(name)
    }
}

pub struct StatusCell {
    status: Mutex<Status>,
    changed: Condvar,
}

impl StatusCell {
    pub fn new(initial: Status) -> Self {
        Self {
            status: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    pub fn get(&self) -> Status {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unconditionally set the status
    pub fn set(&self, next: Status) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("Status {} -> {}", *status, next);
        *status = next;
        self.changed.notify_all();
    }

    /// Set `to` only if the status is still `from`
    pub fn advance(&self, from: Status, to: Status) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status != from {
            return false;
        }
        if from != to {
            trace!("Status {} -> {}", from, to);
            *status = to;
            self.changed.notify_all();
        }
        true
    }

    /// Block until `pred` holds, returning the status that satisfied it
    ///
    /// With a timeout, returns `None` if it elapses first.
    pub fn wait_for<F>(&self, mut pred: F, timeout: Option<Duration>) -> Option<Status>
    where
        F: FnMut(Status) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            if pred(*status) {
                return Some(*status);
            }

            status = match deadline {
                None => self
                    .changed
                    .wait(status)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.changed
                        .wait_timeout(status, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_playing_classification() {
        for status in [Status::Playing, Status::Starting, Status::Queueing, Status::Queued] {
            assert!(status.is_playing(), "{} should count as playing", status);
        }
        for status in [Status::Init, Status::Ready, Status::Stopping, Status::Quit, Status::Zombie] {
            assert!(!status.is_playing(), "{} should not count as playing", status);
        }
        assert!(Status::Quit.is_terminal());
        assert!(Status::Zombie.is_terminal());
        assert!(!Status::Stopping.is_terminal());
    }

    #[test]
    fn test_advance_is_compare_and_set() {
        let cell = StatusCell::new(Status::Ready);

        assert!(!cell.advance(Status::Playing, Status::Stopping));
        assert_eq!(cell.get(), Status::Ready);

        assert!(cell.advance(Status::Ready, Status::Starting));
        assert_eq!(cell.get(), Status::Starting);
    }

    #[test]
    fn test_wait_for_times_out() {
        let cell = StatusCell::new(Status::Ready);
        let result = cell.wait_for(|s| s == Status::Playing, Some(Duration::from_millis(20)));
        assert_eq!(result, None);
    }

    #[test]
    fn test_wait_for_wakes_on_change() {
        let cell = Arc::new(StatusCell::new(Status::Init));
        let setter = Arc::clone(&cell);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            setter.set(Status::Ready);
        });

        let result = cell.wait_for(|s| s == Status::Ready, Some(Duration::from_secs(5)));
        assert_eq!(result, Some(Status::Ready));
        handle.join().unwrap();
    }
}
