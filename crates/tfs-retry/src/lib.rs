//! # tfs-retry
//!
//! Retry support for calls into a remote version-control server:
//! - Synchronous retry executor with a fixed retry interval
//! - Explicit error classification (server, network, retryable domain errors)
//! - Injectable observers and wait primitives
//! - Retry policy configuration (retry.yaml + environment overrides)

pub mod config;
pub mod error;
pub mod remote;
pub mod retry;
pub mod types;

pub use config::RetryConfigLoader;
pub use error::{Error, Result};
pub use remote::{GitTfsError, NetworkError, RemoteError, ServerError};
pub use retry::{
    retry, retry_while, retry_while_with_policy, retry_with_policy, AggregateFailure, ErrorClass,
    RetriesExhausted, RetryError, RetryExecutor, RetryExecutorBuilder,
};
pub use types::{RetryPoliciesConfig, RetryPolicy};
