use thiserror::Error;

/// Canonical error type for the load-generation engine and its collaborators.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Template, entity listing, or output-path syntax was rejected.
    #[error("malformed input: {message}")]
    InputMalformed {
        /// Human-readable description of the offending input.
        message: String,
    },

    /// A remote collaborator (blob store, warehouse, or RPC transport)
    /// could not be reached or refused the operation.
    #[error("{service} unavailable: {message}")]
    ExternalUnavailable {
        /// Collaborator name (e.g. `"blob store"`).
        service: &'static str,
        /// Backend-specific failure detail.
        message: String,
    },

    /// A worker pool failed to drain within its termination window.
    #[error("execution timeout: {message}")]
    ExecutionTimeout {
        /// Which pool timed out and how.
        message: String,
    },

    /// Invariant violation inside the engine.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Creates an `InputMalformed` variant.
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputMalformed {
            message: message.into(),
        }
    }

    /// Creates an `ExternalUnavailable` variant.
    #[must_use]
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalUnavailable {
            service,
            message: message.into(),
        }
    }

    /// Creates an `ExecutionTimeout` variant.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::ExecutionTimeout {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the operation may succeed if retried on a later sample.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionTimeout { .. } | Self::ExternalUnavailable { .. }
        )
    }
}

/// Convenient result alias for engine operations.
pub type BenchResult<T> = Result<T, BenchError>;
