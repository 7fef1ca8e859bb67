//! Pull-based fallback synchronization.
//!
//! The supervisor owns every timer of a view:
//!
//! | slot           | kind      | purpose                                          |
//! |----------------|-----------|--------------------------------------------------|
//! | `status_poll`  | repeating | status check after a start, until `Working`      |
//! | `qr_refresh`   | repeating | re-fetch the QR while awaiting a scan            |
//! | `start_grace`  | one-shot  | status check shortly after a successful start    |
//! | `qr_fetch`     | one-shot  | load the QR for the current session              |
//! | `status_check` | one-shot  | initial probe and forced re-checks               |
//!
//! Timers hold a weak reference back to the supervisor and re-read the store
//! when they fire; a tick that finds nothing to do stops its own loop.

use std::ops::ControlFlow;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use wa_core::{EngineError, QrArtifact, SessionStatus, UiPatch};
use wa_gateway::{GatewayClient, StatusReport};
use wa_settings::{ConsoleSettings, SyncSettings};

use crate::notice::NoticeBoard;
use crate::scheduler::{ScheduledTask, TaskSlot};
use crate::store::SessionStore;

struct Inner {
    store: Arc<SessionStore>,
    gateway: Arc<dyn GatewayClient>,
    notices: Arc<NoticeBoard>,
    sync: SyncSettings,
    session: Mutex<String>,
    status_poll: TaskSlot,
    qr_refresh: TaskSlot,
    start_grace: TaskSlot,
    qr_fetch: TaskSlot,
    status_check: TaskSlot,
}

/// Periodic status checks and QR refresh, coordinated through the store.
#[derive(Clone)]
pub struct PollingSupervisor {
    inner: Arc<Inner>,
}

impl PollingSupervisor {
    /// Supervisor for one view.
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn GatewayClient>,
        notices: Arc<NoticeBoard>,
        settings: &ConsoleSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                gateway,
                notices,
                sync: settings.sync.clone(),
                session: Mutex::new(settings.gateway.session_name.clone()),
                status_poll: TaskSlot::new("status_poll"),
                qr_refresh: TaskSlot::new("qr_refresh"),
                start_grace: TaskSlot::new("start_grace"),
                qr_fetch: TaskSlot::new("qr_fetch"),
                status_check: TaskSlot::new("status_check"),
            }),
        }
    }

    /// Session id QR fetches are issued for.
    pub fn session(&self) -> String {
        self.inner.session.lock().clone()
    }

    /// Record a status observation from any source.
    ///
    /// `Working` hides the QR. `AwaitingQrScan` loads a QR when entering the
    /// state or when none is shown.
    pub fn observe_status(&self, status: SessionStatus, session: Option<String>) {
        self.inner.observe(status, session);
    }

    /// Fetch the status now and record it.
    pub async fn check_status(&self) -> Result<SessionStatus, EngineError> {
        self.inner.check_status().await
    }

    /// Load the QR for the current session in the background.
    pub fn request_qr(&self) {
        Inner::request_qr(&self.inner);
    }

    /// Fetch and normalize the QR without touching the store.
    pub async fn fetch_qr(&self) -> Result<QrArtifact, EngineError> {
        self.inner.fetch_qr().await
    }

    /// Show a freshly obtained QR and make sure it keeps refreshing.
    pub fn present_qr(&self, artifact: QrArtifact) {
        Inner::present_qr(&self.inner, artifact);
    }

    /// Surface a failed QR fetch or decode.
    pub fn reject_qr(&self, err: &EngineError) {
        self.inner.reject_qr(err);
    }

    /// Issue the mount-time status probe.
    ///
    /// A failed probe leaves the status `Unknown` with an error notice.
    pub fn probe(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .status_check
            .replace(ScheduledTask::immediate("status_check", async move {
                let Some(inner) = weak.upgrade() else { return };
                if let Err(e) = inner.check_status().await {
                    warn!(error = %e, "initial status probe failed");
                    let _ = inner.store.apply(UiPatch::new().status(SessionStatus::Unknown));
                    let _ = inner
                        .notices
                        .error(format!("Failed to check session status: {e}"));
                }
            }));
    }

    /// Start-cycle follow-up: restart the status poll and schedule the grace
    /// check.
    pub fn begin_start_cycle(&self) {
        self.inner.status_poll.cancel();
        let weak = Arc::downgrade(&self.inner);
        self.inner.start_grace.replace(ScheduledTask::delayed(
            "start_grace",
            self.inner.sync.start_grace(),
            async move {
                let Some(inner) = weak.upgrade() else { return };
                if let Err(e) = inner.check_status().await {
                    warn!(error = %e, "post-start status check failed");
                }
            },
        ));
        self.start_status_poll();
    }

    /// (Re)start the status poll.
    pub fn start_status_poll(&self) {
        Inner::start_status_poll(&self.inner);
    }

    /// (Re)start the QR refresh timer.
    pub fn start_qr_refresh(&self) {
        Inner::start_qr_refresh(&self.inner);
    }

    /// Start the QR refresh timer unless it is already running.
    pub fn ensure_qr_refresh(&self) {
        Inner::ensure_qr_refresh(&self.inner);
    }

    /// Stop the QR refresh timer.
    pub fn stop_qr_refresh(&self) {
        self.inner.qr_refresh.cancel();
    }

    /// Whether the status poll is running.
    pub fn is_polling(&self) -> bool {
        self.inner.status_poll.is_running()
    }

    /// Whether the QR refresh timer is running.
    pub fn is_refreshing_qr(&self) -> bool {
        self.inner.qr_refresh.is_running()
    }

    /// Cancel every session-cycle timer (stop / logout).
    pub fn stop_all(&self) {
        self.inner.status_poll.cancel();
        self.inner.qr_refresh.cancel();
        self.inner.start_grace.cancel();
        self.inner.qr_fetch.cancel();
    }

    /// Cancel everything, including pending probes (teardown).
    pub fn shutdown(&self) {
        self.stop_all();
        self.inner.status_check.cancel();
    }
}

impl Inner {
    fn observe(self: &Arc<Self>, status: SessionStatus, session: Option<String>) {
        self.observe_with(status, session, false);
    }

    /// With `reload_qr`, an `AwaitingQrScan` observation replaces a QR that is
    /// already shown and restarts its refresh timer.
    fn observe_with(
        self: &Arc<Self>,
        status: SessionStatus,
        session: Option<String>,
        reload_qr: bool,
    ) {
        if let Some(session) = session.filter(|s| !s.is_empty()) {
            *self.session.lock() = session;
        }

        let mut needs_qr = false;
        let changed = self.store.update(|state| {
            needs_qr = status == SessionStatus::AwaitingQrScan
                && (reload_qr
                    || state.status != SessionStatus::AwaitingQrScan
                    || !state.show_qr_code);
            let patch = UiPatch::new().status(status.clone());
            Some(if status.is_working() { patch.hide_qr() } else { patch })
        });
        if !changed.is_empty() {
            info!(status = %status, "session status");
        }

        if status.is_working() {
            self.qr_refresh.cancel();
        }
        if needs_qr {
            Self::load_qr(self, reload_qr);
        }
    }

    async fn check_status(self: &Arc<Self>) -> Result<SessionStatus, EngineError> {
        self.check_status_with(false).await
    }

    async fn check_status_with(
        self: &Arc<Self>,
        reload_qr: bool,
    ) -> Result<SessionStatus, EngineError> {
        let StatusReport { status, session } = self.gateway.get_status().await?;
        debug!(status = %status, ?session, reload_qr, "status checked");
        self.observe_with(status.clone(), session, reload_qr);
        Ok(status)
    }

    async fn fetch_qr(&self) -> Result<QrArtifact, EngineError> {
        let session = self.session.lock().clone();
        let payload = self.gateway.get_qr(&session).await?;
        Ok(QrArtifact::from_payload(payload)?)
    }

    fn request_qr(this: &Arc<Self>) {
        Self::load_qr(this, false);
    }

    /// Fetch the QR in the background. `restart_refresh` restarts the refresh
    /// timer on success instead of keeping one that is already running.
    fn load_qr(this: &Arc<Self>, restart_refresh: bool) {
        let weak = Arc::downgrade(this);
        this.qr_fetch
            .replace(ScheduledTask::immediate("qr_fetch", async move {
                let Some(inner) = weak.upgrade() else { return };
                match inner.fetch_qr().await {
                    Ok(artifact) if restart_refresh => {
                        if Self::show_qr(&inner, artifact) {
                            Self::start_qr_refresh(&inner);
                        }
                    }
                    Ok(artifact) => Self::present_qr(&inner, artifact),
                    Err(e) => {
                        warn!(error = %e, "QR fetch failed");
                        inner.reject_qr(&e);
                    }
                }
            }));
    }

    fn present_qr(this: &Arc<Self>, artifact: QrArtifact) {
        if Self::show_qr(this, artifact) {
            Self::ensure_qr_refresh(this);
        }
    }

    /// Show `artifact` unless the session is already working.
    fn show_qr(this: &Arc<Self>, artifact: QrArtifact) -> bool {
        let changed = this.store.update(|state| {
            (!state.status.is_working()).then(|| UiPatch::new().show_qr(artifact))
        });
        !changed.is_empty()
    }

    fn reject_qr(&self, err: &EngineError) {
        match err {
            EngineError::EmptyPayload => {
                let _ = self.store.apply(UiPatch::new().hide_qr());
                let _ = self.notices.error("QR code was empty, try again");
            }
            other => {
                let _ = self.notices.error(format!("Failed to load QR code: {other}"));
            }
        }
    }

    fn start_status_poll(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        let stop_on_failure = this.sync.stop_polling_on_failure;
        let done = move |status: &SessionStatus| {
            status.is_working() || (stop_on_failure && status.is_failed())
        };
        this.status_poll.replace(ScheduledTask::repeating(
            "status_poll",
            this.sync.status_poll_interval(),
            move || {
                let weak: Weak<Self> = weak.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    if done(&inner.store.snapshot().status) {
                        return ControlFlow::Break(());
                    }
                    match inner.check_status().await {
                        Ok(status) if done(&status) => ControlFlow::Break(()),
                        Ok(_) => ControlFlow::Continue(()),
                        Err(e) => {
                            warn!(error = %e, "status poll failed");
                            ControlFlow::Continue(())
                        }
                    }
                }
            },
        ));
    }

    fn ensure_qr_refresh(this: &Arc<Self>) {
        if !this.qr_refresh.is_running() {
            Self::start_qr_refresh(this);
        }
    }

    fn start_qr_refresh(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        this.qr_refresh.replace(ScheduledTask::repeating(
            "qr_refresh",
            this.sync.qr_refresh_interval(),
            move || {
                let weak: Weak<Self> = weak.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    let state = inner.store.snapshot();
                    if state.status.is_working() {
                        return ControlFlow::Break(());
                    }
                    if state.status != SessionStatus::AwaitingQrScan || state.is_loading {
                        return ControlFlow::Continue(());
                    }
                    match inner.fetch_qr().await {
                        Ok(artifact) => {
                            let _ = inner.store.update(|state| {
                                (state.status == SessionStatus::AwaitingQrScan)
                                    .then(|| UiPatch::new().show_qr(artifact))
                            });
                            ControlFlow::Continue(())
                        }
                        Err(e) => {
                            warn!(error = %e, "QR refresh failed, re-checking status");
                            if e == EngineError::EmptyPayload {
                                inner.reject_qr(&e);
                            }
                            inner.recheck_status();
                            ControlFlow::Break(())
                        }
                    }
                }
            },
        ));
    }

    /// Forced status re-check after a failed QR refresh, run outside the
    /// calling timer. A session still awaiting its scan gets a new QR and a
    /// restarted refresh timer.
    fn recheck_status(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.status_check
            .replace(ScheduledTask::immediate("status_check", async move {
                let Some(inner) = weak.upgrade() else { return };
                if let Err(e) = inner.check_status_with(true).await {
                    warn!(error = %e, "status re-check failed");
                }
            }));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
