//! Connector error types.

use thiserror::Error;

/// Errors from talking to an external PM tool.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Connector configuration is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Authentication with the external tool failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The external tool rejected the request rate.
    #[error("Rate limited by external tool")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Could not reach the external tool.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The external tool returned an error status.
    #[error("External API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ConnectorError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Check if a retry could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectorError::RateLimited { .. } | ConnectorError::ConnectionFailed { .. } => true,
            ConnectorError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
