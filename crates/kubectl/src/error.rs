//! Error types for manifest lifecycle operations.
//!
//! Errors are categorized so the retry loop can tell a transient client
//! failure apart from a broken configuration or a malformed response.
//! Only failures of the external client itself are worth another attempt.

use thiserror::Error;

/// Categories of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The external client exited non-zero or could not be started
    Transient,
    /// Provider configuration is inconsistent
    Configuration,
    /// The client answered, but not with what we expected
    Response,
    /// A stored identity cannot be decoded
    State,
    /// Local filesystem failure
    Io,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transient => "kubectl invocation failed",
            Self::Configuration => "Invalid provider configuration",
            Self::Response => "Unexpected kubectl response",
            Self::State => "Invalid stored resource identity",
            Self::Io => "Filesystem error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transient => "Check cluster connectivity and the kubectl error output",
            Self::Configuration => "Set either kubeconfig or kubeconfig_content, not both",
            Self::Response => "Make sure the manifest describes exactly one object",
            Self::State => "Remove the entry from the state file and apply again",
            Self::Io => "Check permissions of the temporary directory",
        }
    }
}

/// Errors that can occur while reconciling a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// Both a kubeconfig path and inline kubeconfig content were configured
    #[error(
        "both kubeconfig and kubeconfig_content are defined, please use only one of the parameters"
    )]
    ConfigurationConflict,

    /// Materializing inline kubeconfig content failed
    #[error("{context}: {source}")]
    TempFile {
        /// Which step of the materialization failed
        context: &'static str,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The external client exited non-zero or failed to start
    #[error("{command}: {stderr}")]
    Execution {
        /// Full invocation, with secrets redacted
        command: String,
        /// Captured standard error, or the spawn/exit error if stderr was empty
        stderr: String,
    },

    /// The fetch response was not valid JSON
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The fetch response did not describe exactly one object
    #[error("expected to create 1 resource, got {count}")]
    Cardinality {
        /// Number of items found in the response
        count: usize,
    },

    /// The single item in the response had no self-link
    #[error("could not parse self-link from response {response}")]
    MissingSelfLink {
        /// Raw response text
        response: String,
    },

    /// A stored identity could not be split into resource and namespace
    #[error("invalid resource id: {id}")]
    InvalidIdentity {
        /// The offending identity
        id: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Execution { .. } => ErrorCategory::Transient,
            Error::ConfigurationConflict => ErrorCategory::Configuration,
            Error::Decode(_) | Error::Cardinality { .. } | Error::MissingSelfLink { .. } => {
                ErrorCategory::Response
            }
            Error::InvalidIdentity { .. } => ErrorCategory::State,
            Error::TempFile { .. } | Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;
