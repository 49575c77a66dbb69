//! Retry execution engine
//!
//! This module provides the synchronous retry loop, its builder, and the
//! convenience functions used with default settings.

use std::convert::Infallible;
use std::fmt::Display;
use std::time::Instant;

use crate::types::RetryPolicy;

use super::classify::{ErrorClassifier, TypeClassifier};
use super::error::{AggregateFailure, RetriesExhausted, RetryError, WhileError};
use super::observer::{NoOpObserver, RetryObserver, TracingObserver};
use super::wait::{ThreadSleep, Waiter};

/// Retry an operation with the default policy (30s interval, 100 attempts)
///
/// Errors are classified with [`TypeClassifier::remote_defaults`] and retry
/// lines are logged through [`TracingObserver`].
///
/// # Example
///
/// ```rust,no_run
/// use tfs_retry::{retry, RemoteError, ServerError};
///
/// let changeset = retry(|| -> Result<u32, RemoteError> {
///     // Query the server here
///     Err(ServerError::new("TF400324: service unavailable").into())
/// });
/// ```
pub fn retry<T, E, F>(op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
    TypeClassifier: ErrorClassifier<E>,
{
    retry_with_policy(&RetryPolicy::default(), op)
}

/// Retry an operation with an explicit policy
pub fn retry_with_policy<T, E, F>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
    TypeClassifier: ErrorClassifier<E>,
{
    RetryExecutorBuilder::new()
        .with_policy(*policy)
        .with_observer(TracingObserver::default())
        .build()
        .execute(op)
}

/// Re-check a condition with the default policy while it holds
pub fn retry_while<F>(condition: F) -> Result<(), RetriesExhausted>
where
    F: FnMut() -> bool,
{
    retry_while_with_policy(&RetryPolicy::default(), condition)
}

/// Re-check a condition with an explicit policy while it holds
pub fn retry_while_with_policy<F>(policy: &RetryPolicy, condition: F) -> Result<(), RetriesExhausted>
where
    F: FnMut() -> bool,
{
    RetryExecutorBuilder::new()
        .with_policy(*policy)
        .with_observer(TracingObserver::default())
        .build()
        .execute_while(condition)
}

/// Builder for configuring a [`RetryExecutor`]
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tfs_retry::retry::{RetryExecutorBuilder, TracingObserver, TypeClassifier};
/// use tfs_retry::RetryPolicy;
///
/// let executor = RetryExecutorBuilder::new()
///     .with_policy(RetryPolicy::new(Duration::from_secs(5), 10))
///     .with_classifier(TypeClassifier::remote_defaults().network::<std::io::Error>())
///     .with_observer(TracingObserver::new("checkin"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<C = TypeClassifier, O = NoOpObserver, W = ThreadSleep> {
    policy: RetryPolicy,
    classifier: C,
    observer: O,
    waiter: W,
}

impl Default for RetryExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            classifier: TypeClassifier::remote_defaults(),
            observer: NoOpObserver,
            waiter: ThreadSleep,
        }
    }
}

impl<C, O, W> RetryExecutorBuilder<C, O, W> {
    /// Set the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the classifier deciding which errors are retried
    pub fn with_classifier<C2>(self, classifier: C2) -> RetryExecutorBuilder<C2, O, W> {
        RetryExecutorBuilder {
            policy: self.policy,
            classifier,
            observer: self.observer,
            waiter: self.waiter,
        }
    }

    /// Set the observer receiving retry events
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<C, O2, W> {
        RetryExecutorBuilder {
            policy: self.policy,
            classifier: self.classifier,
            observer,
            waiter: self.waiter,
        }
    }

    /// Set the primitive used to wait between attempts
    pub fn with_waiter<W2>(self, waiter: W2) -> RetryExecutorBuilder<C, O, W2> {
        RetryExecutorBuilder {
            policy: self.policy,
            classifier: self.classifier,
            observer: self.observer,
            waiter,
        }
    }

    /// Build the executor
    pub fn build(self) -> RetryExecutor<C, O, W> {
        RetryExecutor {
            policy: self.policy,
            classifier: self.classifier,
            observer: self.observer,
            waiter: self.waiter,
        }
    }
}

/// A synchronous retry executor
///
/// Holds no state between calls: every `execute` or `execute_while` starts
/// with a fresh budget. Use [`RetryExecutorBuilder`] to create an instance.
pub struct RetryExecutor<C = TypeClassifier, O = NoOpObserver, W = ThreadSleep> {
    policy: RetryPolicy,
    classifier: C,
    observer: O,
    waiter: W,
}

impl RetryExecutor {
    /// Executor with the given policy and default components
    pub fn new(policy: RetryPolicy) -> Self {
        RetryExecutorBuilder::new().with_policy(policy).build()
    }
}

impl<C, O, W> RetryExecutor<C, O, W> {
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }
}

impl<C, O, W> RetryExecutor<C, O, W>
where
    O: RetryObserver,
    W: Waiter,
{
    /// Run `op` until it succeeds, fails with an unclassified error, or the
    /// attempt budget runs out
    ///
    /// The interval is waited after every retryable failure, the last one
    /// included. With `max_attempts == 0` no attempt is made and an empty
    /// [`AggregateFailure`] is returned.
    pub fn execute<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
        C: ErrorClassifier<E>,
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts;
        let interval = self.policy.interval();
        let mut failures: Vec<E> = Vec::new();

        for attempt in 1..=max_attempts {
            match op() {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(value);
                }
                Err(err) => {
                    let class = self.classifier.classify(&err);
                    if !class.is_retryable() {
                        self.observer.on_unclassified(attempt, &err);
                        return Err(RetryError::Unclassified {
                            error: err,
                            attempt,
                        });
                    }

                    self.observer
                        .on_attempt_failed(attempt, max_attempts, &err, class, interval);
                    failures.push(err);

                    self.waiter.wait(interval);
                }
            }
        }

        self.observer.on_exhausted(max_attempts, start.elapsed());
        Err(RetryError::Exhausted(AggregateFailure::new(failures)))
    }

    /// Re-check `condition` while it returns true, waiting between checks
    ///
    /// Fails once the condition has held `max_attempts + 1` times.
    pub fn execute_while<F>(&self, mut condition: F) -> Result<(), RetriesExhausted>
    where
        F: FnMut() -> bool,
    {
        match self.try_execute_while(|| Ok::<_, Infallible>(condition())) {
            Ok(()) => Ok(()),
            Err(WhileError::Exhausted(err)) => Err(err),
            Err(WhileError::Predicate(never)) => match never {},
        }
    }

    /// Like [`execute_while`](Self::execute_while) for a condition that can
    /// fail; a failure is returned at once, never retried
    pub fn try_execute_while<E, F>(&self, mut condition: F) -> Result<(), WhileError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts;
        let interval = self.policy.interval();
        let mut count: u32 = 0;

        while condition().map_err(WhileError::Predicate)? {
            count = match next_condition_count(count, max_attempts) {
                Some(next) => next,
                None => {
                    self.observer.on_exhausted(max_attempts, start.elapsed());
                    return Err(WhileError::Exhausted(RetriesExhausted { max_attempts }));
                }
            };

            self.observer
                .on_condition_retry(count, max_attempts, interval);
            self.waiter.wait(interval);
        }

        Ok(())
    }
}

/// The retry number for the next held condition, or `None` once the budget is spent
///
/// Never wraps or saturates, so a `u32::MAX` budget still ends.
fn next_condition_count(count: u32, max_attempts: u32) -> Option<u32> {
    count.checked_add(1).filter(|next| *next <= max_attempts)
}
