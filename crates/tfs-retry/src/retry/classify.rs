//! Error classification
//!
//! The executor only retries errors its classifier tags as retryable. Every
//! other error bypasses the retry machinery and reaches the caller untouched.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

use crate::remote::{GitTfsError, NetworkError, RemoteError, ServerError};

/// Classification tag for an error raised by a retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The remote server reported a transient condition
    Server,
    /// Transport-level failure
    Network,
    /// A recognized domain error marked retryable
    DomainRetryable,
    /// Not eligible for retry
    Unclassified,
}

impl ErrorClass {
    /// Whether an error with this tag enters the retry path
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Unclassified)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Server => "server",
            ErrorClass::Network => "network",
            ErrorClass::DomainRetryable => "domain",
            ErrorClass::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// Errors that know their own classification
pub trait Classify {
    fn error_class(&self) -> ErrorClass;
}

/// Decides whether an error is eligible for retry, and under which tag
///
/// Implementations must be deterministic: the same error always yields the
/// same tag.
///
/// # Example
///
/// ```rust
/// use tfs_retry::retry::{ErrorClass, ErrorClassifier};
/// use std::io::{Error, ErrorKind};
///
/// struct IoClassifier;
///
/// impl ErrorClassifier<Error> for IoClassifier {
///     fn classify(&self, error: &Error) -> ErrorClass {
///         match error.kind() {
///             ErrorKind::TimedOut | ErrorKind::ConnectionReset => ErrorClass::Network,
///             _ => ErrorClass::Unclassified,
///         }
///     }
/// }
/// ```
pub trait ErrorClassifier<E: ?Sized>: Send + Sync {
    fn classify(&self, error: &E) -> ErrorClass;
}

/// Defers to the error's own [`Classify`] implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfClassifier;

impl<E: Classify + ?Sized> ErrorClassifier<E> for SelfClassifier {
    fn classify(&self, error: &E) -> ErrorClass {
        error.error_class()
    }
}

/// A classifier backed by a closure
pub struct ClosureClassifier<F> {
    classify: F,
}

impl<F> ClosureClassifier<F> {
    pub fn new(classify: F) -> Self {
        Self { classify }
    }
}

impl<E, F> ErrorClassifier<E> for ClosureClassifier<F>
where
    F: Fn(&E) -> ErrorClass + Send + Sync,
{
    fn classify(&self, error: &E) -> ErrorClass {
        (self.classify)(error)
    }
}

struct Rule {
    type_name: &'static str,
    matches: fn(&(dyn StdError + 'static)) -> bool,
    class: ErrorClass,
}

fn is_type<T: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<T>()
}

/// Ordered table from concrete error types to classification tags
///
/// Only the outermost error is inspected; `source` chains are never walked.
/// The first matching rule wins. Errors matching no rule are
/// [`ErrorClass::Unclassified`].
///
/// # Example
///
/// ```rust
/// use tfs_retry::retry::{ErrorClass, TypeClassifier};
/// use tfs_retry::ServerError;
///
/// let classifier = TypeClassifier::remote_defaults().network::<std::io::Error>();
/// let err = ServerError::new("TF400324: service unavailable");
/// assert_eq!(classifier.classify_error(&err), ErrorClass::Server);
/// ```
pub struct TypeClassifier {
    rules: Vec<Rule>,
}

impl TypeClassifier {
    /// An empty table: nothing is retried
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The remote-server error kinds: server, network and bridge errors
    pub fn remote_defaults() -> Self {
        Self::new()
            .server::<ServerError>()
            .network::<NetworkError>()
            .domain_retryable::<GitTfsError>()
    }

    /// Map error type `T` to `class`
    pub fn register<T: StdError + 'static>(mut self, class: ErrorClass) -> Self {
        self.rules.push(Rule {
            type_name: type_name::<T>(),
            matches: is_type::<T>,
            class,
        });
        self
    }

    pub fn server<T: StdError + 'static>(self) -> Self {
        self.register::<T>(ErrorClass::Server)
    }

    pub fn network<T: StdError + 'static>(self) -> Self {
        self.register::<T>(ErrorClass::Network)
    }

    pub fn domain_retryable<T: StdError + 'static>(self) -> Self {
        self.register::<T>(ErrorClass::DomainRetryable)
    }

    /// Classify a type-erased error against the table
    pub fn classify_error(&self, error: &(dyn StdError + 'static)) -> ErrorClass {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(error))
            .map(|rule| rule.class)
            .unwrap_or(ErrorClass::Unclassified)
    }

    /// Registered type names with their tags, in lookup order
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, ErrorClass)> + '_ {
        self.rules.iter().map(|rule| (rule.type_name, rule.class))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::remote_defaults()
    }
}

impl fmt::Debug for TypeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.rules()).finish()
    }
}

impl ErrorClassifier<dyn StdError + 'static> for TypeClassifier {
    fn classify(&self, error: &(dyn StdError + 'static)) -> ErrorClass {
        self.classify_error(error)
    }
}

impl ErrorClassifier<dyn StdError + Send + Sync + 'static> for TypeClassifier {
    fn classify(&self, error: &(dyn StdError + Send + Sync + 'static)) -> ErrorClass {
        self.classify_error(error)
    }
}

impl ErrorClassifier<Box<dyn StdError + Send + Sync>> for TypeClassifier {
    fn classify(&self, error: &Box<dyn StdError + Send + Sync>) -> ErrorClass {
        self.classify_error(&**error)
    }
}

impl ErrorClassifier<anyhow::Error> for TypeClassifier {
    fn classify(&self, error: &anyhow::Error) -> ErrorClass {
        let error: &(dyn StdError + Send + Sync + 'static) = error.as_ref();
        self.classify_error(error)
    }
}

impl ErrorClassifier<RemoteError> for TypeClassifier {
    fn classify(&self, error: &RemoteError) -> ErrorClass {
        match error {
            RemoteError::Server(inner) => self.classify_error(inner),
            RemoteError::Network(inner) => self.classify_error(inner),
            RemoteError::Domain(inner) => self.classify_error(inner),
            RemoteError::Other(inner) => ErrorClassifier::<anyhow::Error>::classify(self, inner),
        }
    }
}
