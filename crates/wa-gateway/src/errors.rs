//! Gateway error types.

use thiserror::Error;
use wa_core::EngineError;

/// Errors returned by [`GatewayClient`](crate::GatewayClient) implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Failure detail extracted from the response body.
        message: String,
    },

    /// The request never completed (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response arrived but could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The push channel failed mid-stream.
    #[error("event stream error: {0}")]
    Stream(String),

    /// A URL could not be built from the configured base.
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// The detail shown to the operator.
    ///
    /// For HTTP failures this is the gateway's own message rather than the
    /// status line.
    pub fn detail(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<GatewayError> for EngineError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidResponse(msg) => Self::Decode(msg),
            other => Self::Transport(other.detail()),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
