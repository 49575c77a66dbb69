//! Retry observation and logging
//!
//! The executor reports to a [`RetryObserver`] instead of writing to a global
//! log. Observer methods return nothing, so an observer that fails to deliver
//! a message cannot change what the executor does.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::classify::ErrorClass;

/// Render the line reported after a failed attempt of `execute`
///
/// `<message>: Retry #<attempt>/<max_attempts> in <interval> seconds.`
pub fn retry_line(
    message: &dyn Display,
    attempt: u32,
    max_attempts: u32,
    interval: Duration,
) -> String {
    format!(
        "{}: Retry #{}/{} in {} seconds.",
        message,
        attempt,
        max_attempts,
        interval.as_secs_f64()
    )
}

/// Render the line reported each time the `execute_while` condition holds
///
/// `DoWhile: Retry #<count>/<max_attempts> in <interval> seconds.`
pub fn condition_retry_line(count: u32, max_attempts: u32, interval: Duration) -> String {
    format!(
        "DoWhile: Retry #{}/{} in {} seconds.",
        count,
        max_attempts,
        interval.as_secs_f64()
    )
}

/// Observer trait for retry events
///
/// # Example
///
/// ```rust
/// use tfs_retry::retry::{ErrorClass, RetryObserver};
/// use std::fmt::Display;
/// use std::time::Duration;
///
/// struct StderrObserver;
///
/// impl RetryObserver for StderrObserver {
///     fn on_attempt_failed(
///         &self,
///         attempt: u32,
///         max_attempts: u32,
///         error: &dyn Display,
///         _class: ErrorClass,
///         interval: Duration,
///     ) {
///         eprintln!("{error}: attempt {attempt}/{max_attempts}, waiting {interval:?}");
///     }
///
///     fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration) {
///         eprintln!("condition still holds ({count}/{max_attempts}), waiting {interval:?}");
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called after an attempt failed with a retryable error, before the wait
    ///
    /// `attempt` is 1-indexed.
    fn on_attempt_failed(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn Display,
        class: ErrorClass,
        interval: Duration,
    );

    /// Called each time the `execute_while` condition holds, before the wait
    fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration);

    /// Called when the operation succeeds
    fn on_success(&self, attempt: u32, total_duration: Duration) {
        let _ = (attempt, total_duration);
    }

    /// Called when the budget is exhausted
    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        let _ = (attempts, total_duration);
    }

    /// Called when an unclassified error is about to be handed back to the caller
    fn on_unclassified(&self, attempt: u32, error: &dyn Display) {
        let _ = (attempt, error);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_failed(
        &self,
        _attempt: u32,
        _max_attempts: u32,
        _error: &dyn Display,
        _class: ErrorClass,
        _interval: Duration,
    ) {
    }

    fn on_condition_retry(&self, _count: u32, _max_attempts: u32, _interval: Duration) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_failed`: WARN (the retry line)
/// - `on_condition_retry`: WARN (the DoWhile line)
/// - `on_success`: INFO, only after at least one retry
/// - `on_exhausted`: ERROR
///
/// An unclassified error is handed back to the caller without a log line.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_failed(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn Display,
        class: ErrorClass,
        interval: Duration,
    ) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            class = %class,
            interval_ms = interval.as_millis() as u64,
            error = %error,
            "{}",
            retry_line(error, attempt, max_attempts, interval)
        );
    }

    fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = count,
            max_attempts = max_attempts,
            interval_ms = interval.as_millis() as u64,
            "{}",
            condition_retry_line(count, max_attempts, interval)
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            total_duration_ms = total_duration.as_millis() as u64,
            "all retry attempts exhausted"
        );
    }
}

/// An observer that counts retry events
#[derive(Debug, Default)]
pub struct StatsObserver {
    failures: AtomicU32,
    condition_retries: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    unclassified: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retryable failures reported by `execute`
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Times the `execute_while` condition held within budget
    pub fn condition_retries(&self) -> u32 {
        self.condition_retries.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    pub fn unclassified(&self) -> u32 {
        self.unclassified.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_failed(
        &self,
        _attempt: u32,
        _max_attempts: u32,
        _error: &dyn Display,
        _class: ErrorClass,
        _interval: Duration,
    ) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_condition_retry(&self, _count: u32, _max_attempts: u32, _interval: Duration) {
        self.condition_retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _total_duration: Duration) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unclassified(&self, _attempt: u32, _error: &dyn Display) {
        self.unclassified.fetch_add(1, Ordering::SeqCst);
    }
}

/// An observer that keeps the rendered retry lines
#[derive(Debug, Default)]
pub struct RecordingObserver {
    lines: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

impl RetryObserver for RecordingObserver {
    fn on_attempt_failed(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn Display,
        _class: ErrorClass,
        interval: Duration,
    ) {
        self.push(retry_line(error, attempt, max_attempts, interval));
    }

    fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration) {
        self.push(condition_retry_line(count, max_attempts, interval));
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_attempt_failed(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn Display,
        class: ErrorClass,
        interval: Duration,
    ) {
        (**self).on_attempt_failed(attempt, max_attempts, error, class, interval)
    }

    fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration) {
        (**self).on_condition_retry(count, max_attempts, interval)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        (**self).on_exhausted(attempts, total_duration)
    }

    fn on_unclassified(&self, attempt: u32, error: &dyn Display) {
        (**self).on_unclassified(attempt, error)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_failed(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: &dyn Display,
        class: ErrorClass,
        interval: Duration,
    ) {
        (**self).on_attempt_failed(attempt, max_attempts, error, class, interval)
    }

    fn on_condition_retry(&self, count: u32, max_attempts: u32, interval: Duration) {
        (**self).on_condition_retry(count, max_attempts, interval)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, total_duration: Duration) {
        (**self).on_exhausted(attempts, total_duration)
    }

    fn on_unclassified(&self, attempt: u32, error: &dyn Display) {
        (**self).on_unclassified(attempt, error)
    }
}
