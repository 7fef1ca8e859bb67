//! Transient user-facing notices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notice severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    /// The operation succeeded.
    Success,
    /// Something failed.
    Error,
}

impl NoticeKind {
    /// Wire/presenter name (`success` / `error`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// An auto-expiring status or error message.
///
/// `id` increases monotonically per view; expiry only clears the notice it
/// was scheduled for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Sequence number within the view.
    pub id: u64,
    /// Text shown to the operator.
    pub text: String,
    /// Severity.
    pub kind: NoticeKind,
    /// When the notice disappears unless superseded first.
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    /// Whether this is an error notice.
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
