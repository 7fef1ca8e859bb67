//! Domain decoding of push-channel events.
//!
//! Each event name has one decode path. Unknown names are not an error
//! (`Ok(None)`); a known name with a malformed body is
//! [`EngineError::Decode`] so the caller can log and drop it.
//!
//! Bodies may arrive flat (`{"status": "WORKING", "session": "default"}`) or
//! wrapped in an envelope (`{"session": "default", "payload": {...}}`). The
//! envelope is unwrapped first; the outer `session` is kept when the payload
//! does not carry its own.

use serde::Deserialize;
use serde_json::Value;
use wa_core::{EngineError, InboundMessage, SessionStatus};

use crate::status::first_str;

/// `session.status`
pub const SESSION_STATUS: &str = "session.status";
/// `session.qr`
pub const SESSION_QR: &str = "session.qr";
/// `message`
pub const MESSAGE: &str = "message";

/// A decoded push event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The session changed status.
    SessionStatus {
        /// New status.
        status: SessionStatus,
        /// Session the status belongs to.
        session: Option<String>,
    },
    /// A fresh login QR code.
    SessionQr {
        /// Raw QR payload (normally base64).
        qr: String,
        /// Session the QR belongs to.
        session: Option<String>,
    },
    /// An inbound chat message.
    Message(InboundMessage),
}

impl GatewayEvent {
    /// Stable label for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStatus { .. } => SESSION_STATUS,
            Self::SessionQr { .. } => SESSION_QR,
            Self::Message(_) => MESSAGE,
        }
    }
}

/// Keys that may carry the session id on a push event, highest priority first.
const EVENT_SESSION_FIELDS: &[&str] = &["session", "name"];

#[derive(Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct QrBody {
    qr: String,
    #[serde(default)]
    session: Option<String>,
}

/// Decode one raw event. An empty event name is treated as `message`, the
/// SSE default.
pub fn decode_event(event: &str, data: &str) -> Result<Option<GatewayEvent>, EngineError> {
    let name = if event.is_empty() { MESSAGE } else { event };
    if !matches!(name, SESSION_STATUS | SESSION_QR | MESSAGE) {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(data)
        .map_err(|e| EngineError::Decode(format!("{name}: invalid JSON: {e}")))?;
    let body = unwrap_envelope(value);

    let decoded = match name {
        SESSION_STATUS => {
            let session = first_str(&body, EVENT_SESSION_FIELDS).map(ToString::to_string);
            let parsed: StatusBody = serde_json::from_value(body)
                .map_err(|e| EngineError::Decode(format!("{name}: {e}")))?;
            GatewayEvent::SessionStatus {
                status: SessionStatus::from_wire(&parsed.status, parsed.reason.as_deref()),
                session,
            }
        }
        SESSION_QR => {
            let parsed: QrBody = serde_json::from_value(body)
                .map_err(|e| EngineError::Decode(format!("{name}: {e}")))?;
            GatewayEvent::SessionQr {
                qr: parsed.qr,
                session: parsed.session,
            }
        }
        _ => GatewayEvent::Message(InboundMessage::from_value(&body)?),
    };
    Ok(Some(decoded))
}

fn unwrap_envelope(value: Value) -> Value {
    let Value::Object(mut outer) = value else {
        return value;
    };
    match outer.remove("payload") {
        Some(Value::Object(mut payload)) => {
            if !payload.contains_key("session") {
                if let Some(session) = outer.remove("session") {
                    let _ = payload.insert("session".to_string(), session);
                }
            }
            Value::Object(payload)
        }
        Some(other) => {
            let _ = outer.insert("payload".to_string(), other);
            Value::Object(outer)
        }
        None => Value::Object(outer),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
