//! Error hierarchy for the session engine.
//!
//! Every failure in the engine degrades to a user-visible notice or a
//! stopped timer, never a crash. [`EngineError`] carries enough context for
//! the notice text; [`ErrorKind`] is the coarse classification used for
//! logging and for deciding whether a failure is surfaced at all.

use thiserror::Error;

use crate::qr::QrError;

/// Coarse error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad local input. Handled locally, never reaches the network.
    Validation,
    /// Request failed, timed out, or the stream dropped.
    Transport,
    /// Malformed event or QR payload.
    Decode,
    /// QR normalization yielded nothing.
    EmptyPayload,
    /// A user operation is already in flight.
    Busy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::EmptyPayload => "empty_payload",
            Self::Busy => "busy",
        };
        f.write_str(s)
    }
}

/// Errors produced by the synchronization engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Local validation failed (empty fields, invalid phone number).
    #[error("{0}")]
    Validation(String),

    /// The gateway request or stream failed.
    #[error("{0}")]
    Transport(String),

    /// A gateway payload could not be decoded.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// QR normalization produced an empty image reference.
    #[error("QR code payload was empty")]
    EmptyPayload,

    /// Another user-triggered operation is still in flight.
    #[error("another operation is still in progress")]
    Busy,
}

impl EngineError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::EmptyPayload => ErrorKind::EmptyPayload,
            Self::Busy => ErrorKind::Busy,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

impl From<QrError> for EngineError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::EmptyPayload => Self::EmptyPayload,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(EngineError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(EngineError::transport("x").kind(), ErrorKind::Transport);
        assert_eq!(EngineError::Decode("x".into()).kind(), ErrorKind::Decode);
        assert_eq!(EngineError::EmptyPayload.kind(), ErrorKind::EmptyPayload);
        assert_eq!(EngineError::Busy.kind(), ErrorKind::Busy);
    }

    #[test]
    fn transport_display_is_the_detail() {
        let err = EngineError::transport("gateway returned 502: upstream down");
        assert_eq!(err.to_string(), "gateway returned 502: upstream down");
    }

    #[test]
    fn qr_error_converts_to_empty_payload() {
        let err: EngineError = QrError::EmptyPayload.into();
        assert_eq!(err, EngineError::EmptyPayload);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::EmptyPayload.to_string(), "empty_payload");
        assert_eq!(ErrorKind::Transport.to_string(), "transport");
    }
}
