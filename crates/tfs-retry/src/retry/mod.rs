//! Synchronous retry executor for remote-server calls
//!
//! Wraps a fallible operation and re-invokes it after a fixed interval when it
//! fails with a classified transient error, until it succeeds or the attempt
//! budget runs out.
//!
//! # Features
//!
//! - `execute`: retries an operation returning `Result<T, E>`; only errors the
//!   classifier tags as server, network or retryable domain errors are retried
//! - `execute_while`: re-checks a boolean condition while it holds
//! - Explicit, extensible classification via [`ErrorClassifier`]
//! - Observable retry events via the [`RetryObserver`] trait
//! - Injectable wait primitive via the [`Waiter`] trait
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tfs_retry::retry::{NoWait, RetryExecutorBuilder};
//! use tfs_retry::{NetworkError, RemoteError, RetryPolicy};
//!
//! let executor = RetryExecutorBuilder::new()
//!     .with_policy(RetryPolicy::new(Duration::from_secs(30), 3))
//!     .with_waiter(NoWait)
//!     .build();
//!
//! let mut calls = 0;
//! let changeset = executor.execute(|| -> Result<u32, RemoteError> {
//!     calls += 1;
//!     if calls == 1 {
//!         Err(NetworkError::new("connection reset").into())
//!     } else {
//!         Ok(1234)
//!     }
//! });
//! assert_eq!(changeset.unwrap(), 1234);
//! ```

mod classify;
mod error;
mod executor;
mod observer;
mod wait;

pub use classify::{Classify, ClosureClassifier, ErrorClass, ErrorClassifier, SelfClassifier, TypeClassifier};
pub use error::{AggregateFailure, RetriesExhausted, RetryError, WhileError};
pub use executor::{
    retry, retry_while, retry_while_with_policy, retry_with_policy, RetryExecutor,
    RetryExecutorBuilder,
};
pub use observer::{
    condition_retry_line, retry_line, NoOpObserver, RecordingObserver, RetryObserver,
    StatsObserver, TracingObserver,
};
pub use wait::{NoWait, RecordingWaiter, ThreadSleep, Waiter};
