//! Wait primitives used between attempts

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Blocks the calling thread between attempts
pub trait Waiter: Send + Sync {
    fn wait(&self, duration: Duration);
}

/// Sleeps the calling thread for the full duration; not cancellable
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Waiter for ThreadSleep {
    fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

impl Waiter for NoWait {
    fn wait(&self, _duration: Duration) {}
}

/// Records every requested wait without blocking
#[derive(Debug, Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested waits, oldest first
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.waits().len()
    }

    /// Total time the executor would have blocked
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

impl Waiter for RecordingWaiter {
    fn wait(&self, duration: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}

impl<T: Waiter + ?Sized> Waiter for Arc<T> {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration)
    }
}

impl<T: Waiter + ?Sized> Waiter for Box<T> {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration)
    }
}
