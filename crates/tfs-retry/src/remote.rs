//! Error model of the remote version-control server client
//!
//! These are the concrete error kinds a remote-server wrapper raises. The
//! default classifier (`TypeClassifier::remote_defaults`) maps each of them
//! to a retryable tag; anything else is left to the caller.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::retry::{Classify, ErrorClass};

/// The remote server reported a condition expected to clear up on its own
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServerError {
    message: String,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Transport-level failure talking to the remote server
#[derive(Error, Debug)]
#[error("{message}")]
pub struct NetworkError {
    message: String,
    #[source]
    source: Option<io::Error>,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// General bridge-level error that the retry loop treats as retryable
///
/// A more specific error (a mapping conflict, say) can travel as the cause.
/// Classification only looks at this outer error; the cause stays reachable
/// through [`std::error::Error::source`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct GitTfsError {
    message: String,
    #[source]
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl GitTfsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap a more specific error as the cause of this one
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if any
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

/// Any error a remote-server call can produce
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Domain(#[from] GitTfsError),

    /// Anything the bridge does not know how to recover from
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Classify for RemoteError {
    fn error_class(&self) -> ErrorClass {
        match self {
            RemoteError::Server(_) => ErrorClass::Server,
            RemoteError::Network(_) => ErrorClass::Network,
            RemoteError::Domain(_) => ErrorClass::DomainRetryable,
            RemoteError::Other(_) => ErrorClass::Unclassified,
        }
    }
}
