//! Error types for loginflow.

use thiserror::Error;

/// Primary error type for login flow operations.
///
/// Variants carry owned strings so an error can be returned to the caller of
/// [`LoginFlow::start`](crate::auth::LoginFlow::start) and delivered through
/// the flow outcome at the same time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Unable to open the browser, please copy the link to your browser")]
    Unsupported,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Login token expired or revoked, please start the login again")]
    TokenExpired,

    #[error("Insecure URL: {0}")]
    InsecureUrl(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Login flow cancelled")]
    Cancelled,
}

/// Broad error category used to decide how a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The browser could not be opened at all.
    Unsupported,
    /// A single request failed at the network layer; retried by the poll loop.
    TransportTransient,
    /// The server answered with something that does not follow the protocol.
    Protocol,
    /// The server rejected the poll token.
    TokenExpired,
    /// The caller aborted the flow.
    Cancelled,
    /// Bad local configuration.
    Configuration,
    /// An operation was called in the wrong state.
    Contract,
}

impl FlowError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unsupported => ErrorCategory::Unsupported,
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::TransportTransient,
            Self::InvalidResponse(_) | Self::Server { .. } | Self::InsecureUrl(_) => {
                ErrorCategory::Protocol
            }
            Self::TokenExpired => ErrorCategory::TokenExpired,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidState(_) => ErrorCategory::Contract,
        }
    }

    /// Whether the poll loop may absorb this error and try again next tick.
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::TransportTransient
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Timeouts land in `Network`; callers that know the request budget map them
/// to [`FlowError::Timeout`] themselves.
impl From<reqwest::Error> for FlowError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else if error.is_builder() {
            Self::Configuration(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

impl From<std::io::Error> for FlowError {
    fn from(error: std::io::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FlowError>;
