//! Session status and its gateway wire mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current phase of the gateway session, as far as the console knows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum SessionStatus {
    /// Nothing observed yet, or the gateway reported something unrecognised.
    Unknown,
    /// A status probe is in progress or the session is still starting.
    #[default]
    Checking,
    /// The session exists but is not connected.
    Disconnected,
    /// The session waits for the operator to scan a login QR code.
    AwaitingQrScan,
    /// The session is connected and working.
    Working,
    /// No session is running.
    SessionOff,
    /// The gateway reported a hard failure.
    Failed(String),
}

impl SessionStatus {
    /// Map a gateway status string onto a [`SessionStatus`].
    ///
    /// Matching is case-insensitive. `reason` is only used for `FAILED`;
    /// when absent the raw string becomes the reason.
    pub fn from_wire(raw: &str, reason: Option<&str>) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SCAN_QR_CODE" | "SCAN_QR" => Self::AwaitingQrScan,
            "WORKING" | "CONNECTED" => Self::Working,
            "STOPPED" => Self::SessionOff,
            "STARTING" => Self::Checking,
            "DISCONNECTED" => Self::Disconnected,
            "FAILED" => Self::Failed(
                reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or(raw)
                    .to_string(),
            ),
            _ => Self::Unknown,
        }
    }

    /// Human-readable label for presenters.
    pub fn label(&self) -> &str {
        match self {
            Self::Unknown => "Unknown",
            Self::Checking => "Checking...",
            Self::Disconnected => "Disconnected",
            Self::AwaitingQrScan => "Scan QR code",
            Self::Working => "Connected",
            Self::SessionOff => "Session off",
            Self::Failed(_) => "Failed",
        }
    }

    /// Whether the session is connected.
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working)
    }

    /// Whether the gateway reported a hard failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_checking() {
        assert_eq!(SessionStatus::default(), SessionStatus::Checking);
    }

    #[test]
    fn wire_mapping() {
        assert_eq!(
            SessionStatus::from_wire("SCAN_QR_CODE", None),
            SessionStatus::AwaitingQrScan
        );
        assert_eq!(SessionStatus::from_wire("WORKING", None), SessionStatus::Working);
        assert_eq!(SessionStatus::from_wire("connected", None), SessionStatus::Working);
        assert_eq!(SessionStatus::from_wire("STOPPED", None), SessionStatus::SessionOff);
        assert_eq!(SessionStatus::from_wire("STARTING", None), SessionStatus::Checking);
        assert_eq!(
            SessionStatus::from_wire("DISCONNECTED", None),
            SessionStatus::Disconnected
        );
        assert_eq!(SessionStatus::from_wire("banana", None), SessionStatus::Unknown);
    }

    #[test]
    fn failed_carries_reason() {
        assert_eq!(
            SessionStatus::from_wire("FAILED", Some("browser crashed")),
            SessionStatus::Failed("browser crashed".into())
        );
        assert_eq!(
            SessionStatus::from_wire("FAILED", Some("  ")),
            SessionStatus::Failed("FAILED".into())
        );
    }

    #[test]
    fn display_uses_labels() {
        assert_eq!(SessionStatus::Working.to_string(), "Connected");
        assert_eq!(
            SessionStatus::Failed("boom".into()).to_string(),
            "Failed (boom)"
        );
    }

    #[test]
    fn predicates() {
        assert!(SessionStatus::Working.is_working());
        assert!(!SessionStatus::AwaitingQrScan.is_working());
        assert!(SessionStatus::Failed(String::new()).is_failed());
    }
}
