//! Tolerant parsing of `GET /session/status` responses.
//!
//! The gateway answers either with a bare object or with an array of session
//! objects. An empty array is a valid "no session" answer, not an error.

use serde_json::Value;
use wa_core::SessionStatus;

use crate::errors::{GatewayError, Result};

/// Keys that may carry the session id, highest priority first.
const SESSION_FIELDS: &[&str] = &["name", "session"];

/// Keys that may carry a failure reason.
const REASON_FIELDS: &[&str] = &["reason", "error", "message"];

/// A parsed status observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// Mapped session status.
    pub status: SessionStatus,
    /// Session id reported by the gateway, if any.
    pub session: Option<String>,
}

impl StatusReport {
    /// A report without a session id.
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            session: None,
        }
    }

    /// Attach a session id.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}

/// Parse a status response body in either accepted shape.
pub fn parse_status_response(body: &Value) -> Result<StatusReport> {
    match body {
        Value::Array(items) => match items.first() {
            None => Ok(StatusReport::new(SessionStatus::SessionOff)),
            Some(first) => parse_status_object(first),
        },
        Value::Object(_) => parse_status_object(body),
        other => Err(GatewayError::InvalidResponse(format!(
            "status response is neither object nor array: {other}"
        ))),
    }
}

fn parse_status_object(value: &Value) -> Result<StatusReport> {
    let raw = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidResponse("status response has no status".into()))?;

    let reason = first_str(value, REASON_FIELDS);
    let session = first_str(value, SESSION_FIELDS).map(ToString::to_string);

    Ok(StatusReport {
        status: SessionStatus::from_wire(raw, reason),
        session,
    })
}

pub(crate) fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}
