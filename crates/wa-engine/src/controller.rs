//! User-triggered operations.
//!
//! Every network operation follows the same shape: local validation, take
//! the operation lock (`is_loading`), one gateway request, a notice and a
//! follow-up on success, an error notice on failure. The lock is held by an
//! [`OperationGuard`](crate::store::OperationGuard) so it is released on
//! every path. A second operation while one is in flight is rejected with
//! [`EngineError::Busy`].

use std::sync::Arc;

use tracing::{debug, info, warn};
use wa_core::{EngineError, PhoneFormatter, SessionStatus, UiPatch};
use wa_gateway::GatewayClient;
use wa_settings::ConsoleSettings;

use crate::notice::NoticeBoard;
use crate::store::{OperationGuard, SessionStore};
use crate::supervisor::PollingSupervisor;

/// Asks the operator to confirm a destructive operation.
pub trait Confirmer: Send + Sync {
    /// `true` to proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// How a confirmable operation ended, when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The request went out and succeeded.
    Completed,
    /// The operator declined; nothing was sent.
    Declined,
}

/// Entry point for operator actions on one view.
pub struct SessionController {
    store: Arc<SessionStore>,
    gateway: Arc<dyn GatewayClient>,
    supervisor: PollingSupervisor,
    notices: Arc<NoticeBoard>,
    phone: PhoneFormatter,
}

impl SessionController {
    /// Controller for one view.
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn GatewayClient>,
        supervisor: PollingSupervisor,
        notices: Arc<NoticeBoard>,
        settings: &ConsoleSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            supervisor,
            notices,
            phone: PhoneFormatter::new(
                settings.phone.country_code.clone(),
                settings.phone.trunk_digit(),
            ),
        }
    }

    /// Request a session start, then watch it come up.
    pub async fn start_session(&self) -> Result<OperationOutcome, EngineError> {
        let _guard = self.begin("start")?;
        info!("starting session");
        match self.gateway.start_session().await {
            Ok(()) => {
                let _ = self.notices.success("Session start requested");
                self.supervisor.begin_start_cycle();
                Ok(OperationOutcome::Completed)
            }
            Err(e) => Err(self.fail("Failed to start session", e.into())),
        }
    }

    /// Stop the session after confirmation.
    pub async fn stop_session(
        &self,
        confirmer: &dyn Confirmer,
    ) -> Result<OperationOutcome, EngineError> {
        self.ensure_idle()?;
        if !confirmer.confirm("Stop the WhatsApp session?") {
            debug!("stop declined");
            return Ok(OperationOutcome::Declined);
        }
        let _guard = self.begin("stop")?;
        info!("stopping session");
        match self.gateway.stop_session().await {
            Ok(()) => {
                self.end_session(SessionStatus::SessionOff);
                let _ = self.notices.success("Session stopped");
                Ok(OperationOutcome::Completed)
            }
            Err(e) => Err(self.fail("Failed to stop session", e.into())),
        }
    }

    /// Log the account out after confirmation.
    pub async fn logout(&self, confirmer: &dyn Confirmer) -> Result<OperationOutcome, EngineError> {
        self.ensure_idle()?;
        if !confirmer.confirm("Log out of WhatsApp? You will need to scan a new QR code.") {
            debug!("logout declined");
            return Ok(OperationOutcome::Declined);
        }
        let _guard = self.begin("logout")?;
        info!("logging out");
        match self.gateway.logout().await {
            Ok(()) => {
                self.end_session(SessionStatus::Disconnected);
                let _ = self.notices.success("Logged out");
                Ok(OperationOutcome::Completed)
            }
            Err(e) => Err(self.fail("Failed to log out", e.into())),
        }
    }

    /// Send a text message.
    ///
    /// Rejected with [`EngineError::Busy`] while another operation runs,
    /// leaving that operation's form untouched. Otherwise the form fields are
    /// updated so the presenter shows what was attempted. Empty fields or an
    /// invalid number fail locally without a request. On success the form is
    /// reset.
    pub async fn send_message(&self, phone: &str, message: &str) -> Result<(), EngineError> {
        let _guard = self.begin("send")?;
        let _ = self
            .store
            .apply(UiPatch::new().phone_number(phone).message(message));

        if phone.trim().is_empty() || message.trim().is_empty() {
            return Err(self.invalid("Phone number and message must not be empty"));
        }
        if !self.phone.is_valid(phone) {
            return Err(self.invalid("Invalid phone number"));
        }
        let normalized = self.phone.normalize(phone);

        info!(phone = %normalized, len = message.len(), "sending message");
        match self.gateway.send_message(&normalized, message).await {
            Ok(()) => {
                let _ = self.notices.success("Message sent");
                let _ = self.store.apply(UiPatch::new().reset_form());
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to send message", e.into())),
        }
    }

    /// Check the status now.
    pub async fn refresh_status(&self) -> Result<SessionStatus, EngineError> {
        let _guard = self.begin("refresh_status")?;
        self.supervisor
            .check_status()
            .await
            .map_err(|e| self.fail("Failed to check session status", e))
    }

    /// Fetch and show the QR for the current session.
    pub async fn show_qr(&self) -> Result<(), EngineError> {
        if self.store.snapshot().status.is_working() {
            return Err(self.invalid("Session is already connected"));
        }
        let _guard = self.begin("show_qr")?;
        match self.supervisor.fetch_qr().await {
            Ok(artifact) => {
                self.supervisor.present_qr(artifact);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "QR fetch failed");
                self.supervisor.reject_qr(&e);
                Err(e)
            }
        }
    }

    /// Hide the QR panel and stop refreshing it.
    pub fn hide_qr(&self) {
        self.supervisor.stop_qr_refresh();
        let _ = self.store.apply(UiPatch::new().hide_qr());
    }

    /// Probe gateway reachability.
    pub async fn ping(&self) -> Result<String, EngineError> {
        let _guard = self.begin("ping")?;
        match self.gateway.health().await {
            Ok(text) => {
                let shown = if text.is_empty() { "Gateway is reachable" } else { &text };
                let _ = self.notices.success(format!("Gateway: {shown}"));
                Ok(text)
            }
            Err(e) => Err(self.fail("Gateway unreachable", e.into())),
        }
    }

    /// Edit the phone number field.
    pub fn set_phone_number(&self, phone: impl Into<String>) {
        let _ = self.store.apply(UiPatch::new().phone_number(phone));
    }

    /// Edit the message field.
    pub fn set_message(&self, message: impl Into<String>) {
        let _ = self.store.apply(UiPatch::new().message(message));
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.store.snapshot().is_loading {
            return Err(EngineError::Busy);
        }
        Ok(())
    }

    fn begin(&self, operation: &'static str) -> Result<OperationGuard, EngineError> {
        self.store.begin_operation().ok_or_else(|| {
            debug!(operation, "rejected, another operation is in flight");
            EngineError::Busy
        })
    }

    fn end_session(&self, status: SessionStatus) {
        self.supervisor.stop_all();
        let _ = self.store.apply(UiPatch::new().status(status).hide_qr());
    }

    fn invalid(&self, text: &str) -> EngineError {
        let _ = self.notices.error(text);
        EngineError::validation(text)
    }

    fn fail(&self, context: &str, err: EngineError) -> EngineError {
        warn!(error = %err, kind = %err.kind(), "{context}");
        let _ = self.notices.error(format!("{context}: {err}"));
        err
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use wa_core::NoticeKind;

    use super::*;
    use crate::testing::{Call, FakeGateway, Op};

    struct Fixture {
        store: Arc<SessionStore>,
        gateway: Arc<FakeGateway>,
        supervisor: PollingSupervisor,
        controller: Arc<SessionController>,
    }

    fn fixture() -> Fixture {
        let settings = ConsoleSettings::default();
        let store = Arc::new(SessionStore::new());
        let gateway = Arc::new(FakeGateway::new());
        let notices = Arc::new(NoticeBoard::new(Arc::clone(&store), Duration::from_secs(5)));
        let supervisor = PollingSupervisor::new(
            Arc::clone(&store),
            gateway.clone(),
            Arc::clone(&notices),
            &settings,
        );
        let controller = Arc::new(SessionController::new(
            Arc::clone(&store),
            gateway.clone(),
            supervisor.clone(),
            notices,
            &settings,
        ));
        Fixture {
            store,
            gateway,
            supervisor,
            controller,
        }
    }

    fn yes(_: &str) -> bool {
        true
    }

    fn no(_: &str) -> bool {
        false
    }

    #[tokio::test(start_paused = true)]
    async fn start_posts_notice_and_starts_polling() {
        let f = fixture();
        let outcome = f.controller.start_session().await.unwrap();
        assert_eq!(outcome, OperationOutcome::Completed);

        let state = f.store.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.response_type(), Some(NoticeKind::Success));
        assert!(f.supervisor.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_shows_gateway_detail() {
        let f = fixture();
        f.gateway.fail(Op::Start, "Session already exists");
        let err = f.controller.start_session().await.unwrap_err();
        assert_matches!(err, EngineError::Transport(_));

        let state = f.store.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.response_type(), Some(NoticeKind::Error));
        assert_eq!(
            state.response_message(),
            "Failed to start session: Session already exists"
        );
        assert!(!f.supervisor.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn second_operation_is_busy() {
        let f = fixture();
        f.gateway.set_latency(Duration::from_secs(1));
        let controller = Arc::clone(&f.controller);
        let first = tokio::spawn(async move { controller.start_session().await });
        tokio::task::yield_now().await;
        assert!(f.store.snapshot().is_loading);

        assert_matches!(f.controller.ping().await, Err(EngineError::Busy));
        assert_matches!(f.controller.stop_session(&yes).await, Err(EngineError::Busy));

        first.await.unwrap().unwrap();
        assert!(!f.store.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_send_keeps_in_flight_form() {
        let f = fixture();
        f.gateway.set_latency(Duration::from_secs(1));
        let controller = Arc::clone(&f.controller);
        let first =
            tokio::spawn(async move { controller.send_message("081234567890", "first").await });
        tokio::task::yield_now().await;

        assert_matches!(
            f.controller.send_message("089999999999", "second").await,
            Err(EngineError::Busy)
        );
        let state = f.store.snapshot();
        assert_eq!(state.phone_number, "081234567890");
        assert_eq!(state.message, "first");

        first.await.unwrap().unwrap();
        assert_eq!(
            f.gateway.sent(),
            vec![("6281234567890".to_string(), "first".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_declined_sends_nothing() {
        let f = fixture();
        let outcome = f.controller.stop_session(&no).await.unwrap();
        assert_eq!(outcome, OperationOutcome::Declined);
        assert!(f.gateway.calls().is_empty());
        assert!(!f.store.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_hides_qr_and_cancels_timers() {
        let f = fixture();
        f.supervisor
            .observe_status(SessionStatus::AwaitingQrScan, None);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        f.supervisor.start_status_poll();
        assert!(f.store.snapshot().show_qr_code);

        let outcome = f.controller.stop_session(&yes).await.unwrap();
        assert_eq!(outcome, OperationOutcome::Completed);

        let state = f.store.snapshot();
        assert_eq!(state.status, SessionStatus::SessionOff);
        assert!(!state.show_qr_code);
        assert!(state.qr.is_none());
        tokio::task::yield_now().await;
        assert!(!f.supervisor.is_polling());
        assert!(!f.supervisor.is_refreshing_qr());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_sets_disconnected() {
        let f = fixture();
        let _ = f.controller.logout(&yes).await.unwrap();
        assert_eq!(f.store.snapshot().status, SessionStatus::Disconnected);
        assert_eq!(f.gateway.calls(), vec![Call::Logout]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_normalizes_and_resets_form() {
        let f = fixture();
        f.controller
            .send_message("0812-3456-7890", "Halo")
            .await
            .unwrap();

        assert_eq!(
            f.gateway.sent(),
            vec![("6281234567890".to_string(), "Halo".to_string())]
        );
        let state = f.store.snapshot();
        assert_eq!(state.phone_number, "");
        assert_eq!(state.message, "");
        assert_eq!(state.response_type(), Some(NoticeKind::Success));
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_short_number_fails_locally() {
        let f = fixture();
        let err = f.controller.send_message("123", "hi").await.unwrap_err();
        assert_matches!(err, EngineError::Validation(_));

        assert!(f.gateway.calls().is_empty());
        let state = f.store.snapshot();
        assert_eq!(state.response_type(), Some(NoticeKind::Error));
        assert!(!state.is_loading);
        assert_eq!(state.phone_number, "123");
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_empty_message_fails_locally() {
        let f = fixture();
        assert_matches!(
            f.controller.send_message("081234567890", "  ").await,
            Err(EngineError::Validation(_))
        );
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_keeps_form() {
        let f = fixture();
        f.gateway.fail(Op::Send, "not on WhatsApp");
        let _ = f
            .controller
            .send_message("081234567890", "hi")
            .await
            .unwrap_err();
        let state = f.store.snapshot();
        assert_eq!(state.phone_number, "081234567890");
        assert_eq!(state.response_message(), "Failed to send message: not on WhatsApp");
    }

    #[tokio::test(start_paused = true)]
    async fn ping_reports_gateway_text() {
        let f = fixture();
        assert_eq!(f.controller.ping().await.unwrap(), "pong");
        assert_eq!(f.store.snapshot().response_message(), "Gateway: pong");
    }

    #[tokio::test(start_paused = true)]
    async fn show_and_hide_qr() {
        let f = fixture();
        f.controller.show_qr().await.unwrap();
        assert!(f.store.snapshot().show_qr_code);
        assert_eq!(f.gateway.qr_requests(), vec!["default".to_string()]);

        f.controller.hide_qr();
        let state = f.store.snapshot();
        assert!(!state.show_qr_code);
        assert!(state.qr.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn show_qr_refused_when_connected() {
        let f = fixture();
        let _ = f.store.apply(UiPatch::new().status(SessionStatus::Working));
        assert_matches!(f.controller.show_qr().await, Err(EngineError::Validation(_)));
        assert!(f.gateway.qr_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_status_updates_store() {
        let f = fixture();
        f.gateway.set_status(SessionStatus::Working);
        let status = f.controller.refresh_status().await.unwrap();
        assert_eq!(status, SessionStatus::Working);
        assert_eq!(f.store.snapshot().status, SessionStatus::Working);
    }

    #[test]
    fn closures_are_confirmers() {
        let always = |_: &str| true;
        assert!(always.confirm("sure?"));
    }

    #[tokio::test]
    async fn form_edits() {
        let f = fixture();
        f.controller.set_phone_number("0812");
        f.controller.set_message("draft");
        let state = f.store.snapshot();
        assert_eq!(state.phone_number, "0812");
        assert_eq!(state.message, "draft");
    }
}
