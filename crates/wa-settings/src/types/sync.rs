use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Timer intervals for the synchronization engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Status poll period after a session start is requested.
    pub status_poll_interval_ms: u64,
    /// QR auto-refresh period while waiting for a scan.
    pub qr_refresh_interval_ms: u64,
    /// Delay after a successful start before the first status re-check.
    pub start_grace_ms: u64,
    /// How long a notice stays visible.
    pub notice_ttl_ms: u64,
    /// Also stop the status poll when the gateway reports a hard failure.
    pub stop_polling_on_failure: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            status_poll_interval_ms: 3_000,
            qr_refresh_interval_ms: 30_000,
            start_grace_ms: 3_000,
            notice_ttl_ms: 5_000,
            stop_polling_on_failure: false,
        }
    }
}

impl SyncSettings {
    /// Status poll period.
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    /// QR auto-refresh period.
    pub fn qr_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.qr_refresh_interval_ms)
    }

    /// Start grace delay.
    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    /// Notice lifetime.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("sync.statusPollIntervalMs", self.status_poll_interval_ms),
            ("sync.qrRefreshIntervalMs", self.qr_refresh_interval_ms),
            ("sync.noticeTtlMs", self.notice_ttl_ms),
        ] {
            if value == 0 {
                return Err(SettingsError::InvalidValue(format!("{key} must be > 0")));
            }
        }
        Ok(())
    }
}
