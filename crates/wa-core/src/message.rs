//! Inbound message derivation from loosely-shaped gateway payloads.
//!
//! Different gateway builds name the same fields differently. Each field of
//! [`InboundMessage`] is resolved from a fixed priority list; the first
//! non-empty string wins. Unknown and extra fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EngineError;

/// Candidate keys for the message text, highest priority first.
pub const TEXT_FIELDS: &[&str] = &["text", "body", "message"];

/// Candidate keys for the sender JID, highest priority first.
pub const SENDER_FIELDS: &[&str] = &["author", "participant", "from", "chatId"];

/// Candidate keys for the sender display name, highest priority first.
pub const DISPLAY_NAME_FIELDS: &[&str] = &["senderName", "contactName", "pushName", "notifyName"];

/// Keys that identify the chat (not the individual sender).
const CHAT_FIELDS: &[&str] = &["from", "chatId"];

/// JID suffix used for group chats.
const GROUP_SUFFIX: &str = "@g.us";

/// A message received through the push channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Full sender JID (`628123@c.us`).
    pub sender_jid: String,
    /// Message text.
    pub text: String,
    /// Best available display name; falls back to the sender number.
    pub sender_display_name: String,
    /// User part of the sender JID.
    pub sender_number: String,
    /// Whether the message was posted in a group chat.
    pub is_group_originated: bool,
}

impl InboundMessage {
    /// Derive a message from a JSON object using the priority tables.
    ///
    /// Missing text or sender is a decode error; everything else has a
    /// fallback.
    pub fn from_value(value: &Value) -> Result<Self, EngineError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EngineError::Decode("message body is not an object".into()))?;

        let text = first_non_empty(obj, TEXT_FIELDS)
            .ok_or_else(|| EngineError::Decode("message has no text".into()))?;
        let sender_jid = first_non_empty(obj, SENDER_FIELDS)
            .ok_or_else(|| EngineError::Decode("message has no sender".into()))?;

        let sender_number = sender_jid
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        let sender_display_name =
            first_non_empty(obj, DISPLAY_NAME_FIELDS).unwrap_or_else(|| sender_number.clone());
        let is_group_originated = CHAT_FIELDS
            .iter()
            .filter_map(|key| obj.get(*key).and_then(Value::as_str))
            .any(|jid| jid.ends_with(GROUP_SUFFIX));

        Ok(Self {
            sender_jid,
            text,
            sender_display_name,
            sender_number,
            is_group_originated,
        })
    }
}

fn first_non_empty(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
