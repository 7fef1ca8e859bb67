//! Plain-text rendering of store snapshots and changes.

use wa_core::text::truncate_str;
use wa_core::{Field, UiState};
use wa_engine::{BridgeState, FieldChange};

/// Longest image reference printed inline while watching.
const QR_PREVIEW: usize = 72;

/// One-line status summary.
pub fn status_line(state: &UiState) -> String {
    let mut line = format!("status: {}", state.status);
    if state.show_qr_code {
        line.push_str(" (QR code available)");
    }
    line
}

/// The current notice, if any.
pub fn notice_line(state: &UiState) -> Option<String> {
    let notice = state.notice.as_ref()?;
    Some(format!("[{}] {}", notice.kind.as_str(), notice.text))
}

/// Line for one store change. Fields without a textual form yield `None`.
pub fn change_line(change: &FieldChange) -> Option<String> {
    let state = &change.state;
    match change.field {
        Field::Status => Some(status_line(state)),
        Field::ShowQr => Some(match &state.qr {
            Some(qr) if state.show_qr_code => {
                let image = qr.image_ref.as_str();
                let suffix = if image.len() > QR_PREVIEW { "..." } else { "" };
                format!("qr: {}{suffix}", truncate_str(image, QR_PREVIEW))
            }
            _ => "qr: hidden".to_string(),
        }),
        Field::Notice => notice_line(state),
        Field::LastMessage => state.last_message.as_ref().map(|m| {
            let origin = if m.is_group_originated { " (group)" } else { "" };
            format!("message from {}{origin}: {}", m.sender_display_name, m.text)
        }),
        _ => None,
    }
}

/// Line for a push-channel state change.
pub fn bridge_line(state: BridgeState) -> &'static str {
    match state {
        BridgeState::Disconnected => "events: disconnected (polling only)",
        BridgeState::Connecting => "events: connecting",
        BridgeState::Connected => "events: connected",
    }
}
