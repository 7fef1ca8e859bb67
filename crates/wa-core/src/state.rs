//! UI-visible session state and the patch type that mutates it.
//!
//! [`UiState`] is the only entity presenters see. It is never mutated field
//! by field from outside: every change is a [`UiPatch`] applied atomically.
//! The QR invariant (`show_qr_code` ⇒ artifact present, hiding clears the
//! artifact) holds by construction because a patch can only
//! [`UiPatch::show_qr`] with an artifact or [`UiPatch::hide_qr`] both at once.

use serde::{Deserialize, Serialize};

use crate::message::InboundMessage;
use crate::notice::{Notice, NoticeKind};
use crate::qr::QrArtifact;
use crate::status::SessionStatus;

/// Aggregate UI state for one session view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    /// A user-triggered operation is in flight.
    pub is_loading: bool,
    /// Current session status.
    pub status: SessionStatus,
    /// QR code to display, present iff `show_qr_code`.
    pub qr: Option<QrArtifact>,
    /// Whether the QR panel is visible.
    pub show_qr_code: bool,
    /// Last notice, cleared on expiry.
    pub notice: Option<Notice>,
    /// Last inbound message seen on the push channel.
    pub last_message: Option<InboundMessage>,
    /// Phone number form field.
    pub phone_number: String,
    /// Message form field.
    pub message: String,
}

impl UiState {
    /// Kind of the current notice, if any.
    pub fn response_type(&self) -> Option<NoticeKind> {
        self.notice.as_ref().map(|n| n.kind)
    }

    /// Text of the current notice, or empty.
    pub fn response_message(&self) -> &str {
        self.notice.as_ref().map_or("", |n| n.text.as_str())
    }

    /// Apply a patch and return the fields whose value changed, in
    /// [`Field::ALL`] order.
    pub fn apply(&mut self, patch: UiPatch) -> Vec<Field> {
        let before = self.clone();

        if let Some(loading) = patch.loading {
            self.is_loading = loading;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        match patch.qr {
            Some(QrChange::Show(artifact)) => {
                self.qr = Some(artifact);
                self.show_qr_code = true;
            }
            Some(QrChange::Hide) => {
                self.qr = None;
                self.show_qr_code = false;
            }
            None => {}
        }
        if let Some(notice) = patch.notice {
            self.notice = notice;
        }
        if let Some(message) = patch.last_message {
            self.last_message = Some(message);
        }
        if let Some(phone) = patch.phone_number {
            self.phone_number = phone;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }

        Field::ALL
            .iter()
            .copied()
            .filter(|field| field.differs(&before, self))
            .collect()
    }
}

/// Individually observable fields of [`UiState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// `is_loading`
    Loading,
    /// `status`
    Status,
    /// `qr`
    Qr,
    /// `show_qr_code`
    ShowQr,
    /// `notice`
    Notice,
    /// `last_message`
    LastMessage,
    /// `phone_number`
    PhoneNumber,
    /// `message`
    Message,
}

impl Field {
    /// Every field, in notification order.
    pub const ALL: [Self; 8] = [
        Self::Loading,
        Self::Status,
        Self::Qr,
        Self::ShowQr,
        Self::Notice,
        Self::LastMessage,
        Self::PhoneNumber,
        Self::Message,
    ];

    /// Whether this field differs between two states.
    pub fn differs(self, a: &UiState, b: &UiState) -> bool {
        match self {
            Self::Loading => a.is_loading != b.is_loading,
            Self::Status => a.status != b.status,
            Self::Qr => a.qr != b.qr,
            Self::ShowQr => a.show_qr_code != b.show_qr_code,
            Self::Notice => a.notice != b.notice,
            Self::LastMessage => a.last_message != b.last_message,
            Self::PhoneNumber => a.phone_number != b.phone_number,
            Self::Message => a.message != b.message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum QrChange {
    Show(QrArtifact),
    Hide,
}

/// An atomic multi-field update. Unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiPatch {
    loading: Option<bool>,
    status: Option<SessionStatus>,
    qr: Option<QrChange>,
    notice: Option<Option<Notice>>,
    last_message: Option<InboundMessage>,
    phone_number: Option<String>,
    message: Option<String>,
}

impl UiPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loading flag.
    #[must_use]
    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    /// Set the session status.
    #[must_use]
    pub fn status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Show a QR artifact (replaces any previous one).
    #[must_use]
    pub fn show_qr(mut self, artifact: QrArtifact) -> Self {
        self.qr = Some(QrChange::Show(artifact));
        self
    }

    /// Hide the QR panel and drop the artifact.
    #[must_use]
    pub fn hide_qr(mut self) -> Self {
        self.qr = Some(QrChange::Hide);
        self
    }

    /// Replace the current notice.
    #[must_use]
    pub fn notice(mut self, notice: Notice) -> Self {
        self.notice = Some(Some(notice));
        self
    }

    /// Clear the current notice.
    #[must_use]
    pub fn clear_notice(mut self) -> Self {
        self.notice = Some(None);
        self
    }

    /// Record the last inbound message.
    #[must_use]
    pub fn last_message(mut self, message: InboundMessage) -> Self {
        self.last_message = Some(message);
        self
    }

    /// Set the phone number form field.
    #[must_use]
    pub fn phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// Set the message form field.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Clear both form fields.
    #[must_use]
    pub fn reset_form(self) -> Self {
        self.phone_number("").message("")
    }

    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
