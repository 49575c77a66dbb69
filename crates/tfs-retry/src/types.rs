//! Retry policy types
//!
//! These types define how long the executor waits between attempts and how
//! many attempts it makes. They deserialize from `retry.yaml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Retry policy for one call into the executor
///
/// There is no backoff: every retry waits the same `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Delay after each failed attempt, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy from an interval and an attempt budget
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts,
        }
    }

    /// Default interval with a custom attempt budget
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay after each failed attempt
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Worst-case time spent waiting when every attempt fails
    pub fn worst_case_wait(&self) -> Duration {
        self.interval().saturating_mul(self.max_attempts)
    }
}

fn default_interval_ms() -> u64 {
    30_000 // 30 seconds
}
fn default_max_attempts() -> u32 {
    100
}

/// Retry policies: a default plus per-operation overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Policy used when no operation-specific policy exists
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RetryPoliciesConfig {
    /// Policy for the named operation, falling back to the default
    pub fn policy_for(&self, operation: &str) -> RetryPolicy {
        self.operations
            .get(operation)
            .copied()
            .unwrap_or(self.default)
    }
}
