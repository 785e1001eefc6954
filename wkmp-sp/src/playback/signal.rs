//! Counting wake-up signal for the stream worker

use std::sync::{Condvar, Mutex, PoisonError};

/// Counting semaphore; each `notify` releases exactly one `wait`
///
/// Notifications sent while nobody is waiting are kept, so a request made
/// just before the worker blocks is never lost.
#[derive(Default)]
pub struct Signal {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        self.cond.notify_one();
    }

    /// Block until a notification is available, then consume it
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count == 0 {
            count = self.cond.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_notify_before_wait_is_kept() {
        let signal = Signal::new();
        signal.notify();
        signal.notify();
        signal.wait();
        signal.wait();
    }

    #[test]
    fn test_wait_blocks_until_notified() {
        let signal = Arc::new(Signal::new());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || waiter.wait());

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        signal.notify();
        handle.join().unwrap();
    }
}
