//! Error types for the retry executor
//!
//! `execute` fails with [`RetryError`]: either the budget ran out
//! ([`AggregateFailure`], every attempt's error in order) or an unclassified
//! error escaped on its own. `execute_while` fails with [`RetriesExhausted`].

use std::error::Error;
use std::fmt;

/// Every classified error observed while retrying one operation, in attempt order
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFailure<E> {
    errors: Vec<E>,
}

impl<E> AggregateFailure<E> {
    pub fn new(errors: Vec<E>) -> Self {
        Self { errors }
    }

    /// Errors in attempt order
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Number of failed attempts recorded
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no attempt was made (a zero attempt budget)
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error from the first failed attempt
    pub fn first(&self) -> Option<&E> {
        self.errors.first()
    }

    /// Error from the final failed attempt
    pub fn last(&self) -> Option<&E> {
        self.errors.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }
}

impl<E: fmt::Display> fmt::Display for AggregateFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.last() {
            Some(last) => write!(
                f,
                "retry exhausted after {} attempts: {}",
                self.errors.len(),
                last
            ),
            None => write!(f, "retry exhausted after 0 attempts"),
        }
    }
}

impl<E: Error + 'static> Error for AggregateFailure<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.last().map(|err| err as &(dyn Error + 'static))
    }
}

impl<E> IntoIterator for AggregateFailure<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a AggregateFailure<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted(AggregateFailure<E>),

    /// The operation failed with an error the classifier does not retry
    ///
    /// The error is passed through exactly as the operation returned it.
    Unclassified {
        error: E,
        /// The 1-indexed attempt that raised it
        attempt: u32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted(failure) => fmt::Display::fmt(failure, f),
            RetryError::Unclassified { error, .. } => fmt::Display::fmt(error, f),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Exhausted(failure) => failure.source(),
            RetryError::Unclassified { error, .. } => error.source(),
        }
    }
}

impl<E> From<AggregateFailure<E>> for RetryError<E> {
    fn from(failure: AggregateFailure<E>) -> Self {
        RetryError::Exhausted(failure)
    }
}

impl<E> RetryError<E> {
    /// Check if the retry budget was exhausted
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted(_))
    }

    /// Check if an unclassified error escaped
    pub fn is_unclassified(&self) -> bool {
        matches!(self, RetryError::Unclassified { .. })
    }

    /// Number of attempts the executor made
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted(failure) => failure.len(),
            RetryError::Unclassified { attempt, .. } => *attempt as usize,
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateFailure<E>> {
        match self {
            RetryError::Exhausted(failure) => Some(failure),
            RetryError::Unclassified { .. } => None,
        }
    }

    pub fn into_aggregate(self) -> Option<AggregateFailure<E>> {
        match self {
            RetryError::Exhausted(failure) => Some(failure),
            RetryError::Unclassified { .. } => None,
        }
    }

    /// The escaped error, if this is an unclassified failure
    pub fn into_unclassified(self) -> Option<E> {
        match self {
            RetryError::Unclassified { error, .. } => Some(error),
            RetryError::Exhausted(_) => None,
        }
    }

    /// Every underlying error, consuming this error
    pub fn into_errors(self) -> Vec<E> {
        match self {
            RetryError::Exhausted(failure) => failure.into_errors(),
            RetryError::Unclassified { error, .. } => vec![error],
        }
    }

    /// Map the error type using a closure
    pub fn map_err<F, E2>(self, mut f: F) -> RetryError<E2>
    where
        F: FnMut(E) -> E2,
    {
        match self {
            RetryError::Exhausted(failure) => RetryError::Exhausted(AggregateFailure::new(
                failure.into_errors().into_iter().map(&mut f).collect(),
            )),
            RetryError::Unclassified { error, attempt } => RetryError::Unclassified {
                error: f(error),
                attempt,
            },
        }
    }
}

/// `execute_while` saw its condition hold more times than the budget allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Action failed after {max_attempts} retries!")]
pub struct RetriesExhausted {
    pub max_attempts: u32,
}

/// Failure of `try_execute_while`
#[derive(Debug)]
pub enum WhileError<E> {
    /// The condition kept holding past the budget
    Exhausted(RetriesExhausted),

    /// The condition itself failed; never retried
    Predicate(E),
}

impl<E: fmt::Display> fmt::Display for WhileError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhileError::Exhausted(err) => fmt::Display::fmt(err, f),
            WhileError::Predicate(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<E: Error + 'static> Error for WhileError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WhileError::Exhausted(_) => None,
            WhileError::Predicate(err) => err.source(),
        }
    }
}

impl<E> From<RetriesExhausted> for WhileError<E> {
    fn from(err: RetriesExhausted) -> Self {
        WhileError::Exhausted(err)
    }
}
