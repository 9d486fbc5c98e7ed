//! # Error Taxonomy
//!
//! Two kinds of failure cross the uniform client contract: configuration
//! errors raised while a factory is being set up, and backend failures raised
//! by a wrapped driver. A cache miss is not an error.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::types::BackendKind;

/// Result alias used across the workspace.
pub type CacheResult<T> = Result<T, CacheError>;

/// Boxed driver error kept as context on backend failures.
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The operation exceeded the configured timeout.
    Timeout,
    /// The server could not be reached or the connection dropped.
    Connection,
    /// The driver could not make sense of the server's reply.
    Protocol,
    /// The server answered with an error reply.
    Server,
    /// No pooled connection could be obtained.
    Pool,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connection => "connection",
            FailureKind::Protocol => "protocol",
            FailureKind::Server => "server",
            FailureKind::Pool => "pool",
        };
        f.write_str(label)
    }
}

/// Errors surfaced through the factory and the uniform client contract.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid strategy, address list or settings. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A wrapped driver failed during construction, `get` or `set`.
    #[error("{backend} backend {kind} failure: {source}")]
    Backend {
        backend: BackendKind,
        kind: FailureKind,
        #[source]
        source: BoxedSource,
    },
}

impl CacheError {
    /// Builds a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CacheError::Configuration(message.into())
    }

    /// Wraps a driver error as a backend failure.
    pub fn backend<E>(backend: BackendKind, kind: FailureKind, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        CacheError::Backend {
            backend,
            kind,
            source: source.into(),
        }
    }

    /// True for construction-time misconfiguration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::Configuration(_))
    }

    /// True for any driver failure.
    pub fn is_backend(&self) -> bool {
        matches!(self, CacheError::Backend { .. })
    }

    /// True when a driver gave up after the operation timeout.
    pub fn is_timeout(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Timeout)
    }

    /// Failure classification, `None` for configuration errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CacheError::Backend { kind, .. } => Some(*kind),
            CacheError::Configuration(_) => None,
        }
    }

    /// Backend that raised the failure, `None` for configuration errors.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        match self {
            CacheError::Backend { backend, .. } => Some(*backend),
            CacheError::Configuration(_) => None,
        }
    }
}
