//! One view lifetime: mount wires the engine together, teardown stops it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wa_core::{Field, UiState};
use wa_gateway::GatewayClient;
use wa_settings::ConsoleSettings;

use crate::bridge::{BridgeState, RealtimeEventBridge};
use crate::controller::SessionController;
use crate::notice::NoticeBoard;
use crate::store::{FieldSubscription, SessionStore};
use crate::supervisor::PollingSupervisor;

/// A mounted session view.
///
/// Must be created inside a tokio runtime. Teardown runs on drop if it was
/// not called explicitly.
pub struct SessionView {
    store: Arc<SessionStore>,
    notices: Arc<NoticeBoard>,
    supervisor: PollingSupervisor,
    controller: SessionController,
    bridge: Arc<RealtimeEventBridge>,
    bridge_cancel: CancellationToken,
    torn_down: AtomicBool,
}

impl SessionView {
    /// Build the engine, open the event stream and issue the status probe.
    pub fn mount(gateway: Arc<dyn GatewayClient>, settings: &ConsoleSettings) -> Self {
        let store = Arc::new(SessionStore::new());
        let notices = Arc::new(NoticeBoard::new(
            Arc::clone(&store),
            settings.sync.notice_ttl(),
        ));
        let supervisor = PollingSupervisor::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::clone(&notices),
            settings,
        );
        let controller = SessionController::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            supervisor.clone(),
            Arc::clone(&notices),
            settings,
        );
        let bridge = Arc::new(RealtimeEventBridge::new(
            gateway,
            Arc::clone(&store),
            supervisor.clone(),
        ));

        let bridge_cancel = CancellationToken::new();
        let _ = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            let cancel = bridge_cancel.clone();
            async move { bridge.run(cancel).await }
        });
        supervisor.probe();
        info!(session = %supervisor.session(), "session view mounted");

        Self {
            store,
            notices,
            supervisor,
            controller,
            bridge,
            bridge_cancel,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Current UI state.
    pub fn snapshot(&self) -> UiState {
        self.store.snapshot()
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Operator actions.
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Fallback synchronization.
    pub fn supervisor(&self) -> &PollingSupervisor {
        &self.supervisor
    }

    /// Push-channel state.
    pub fn bridge_state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// Observe push-channel state.
    pub fn watch_bridge(&self) -> watch::Receiver<BridgeState> {
        self.bridge.watch_state()
    }

    /// Subscribe to store changes.
    pub fn subscribe(&self, fields: &[Field]) -> FieldSubscription {
        self.store.subscribe_many(fields)
    }

    /// Close the stream, cancel every timer and the notice expiry, and close
    /// the store. Idempotent.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bridge_cancel.cancel();
        self.supervisor.shutdown();
        self.notices.cancel();
        self.store.close();
        info!("session view torn down");
    }
}

impl Drop for SessionView {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;
    use wa_core::SessionStatus;

    use super::*;
    use crate::testing::{Call, FakeGateway, Op};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mount_probes_and_subscribes() {
        let gateway = Arc::new(FakeGateway::new());
        let view = SessionView::mount(gateway.clone(), &ConsoleSettings::default());
        assert_eq!(view.snapshot().status, SessionStatus::Checking);
        settle().await;

        assert_eq!(view.snapshot().status, SessionStatus::SessionOff);
        assert_eq!(view.bridge_state(), BridgeState::Connected);
        let calls = gateway.calls();
        assert!(calls.contains(&Call::Subscribe));
        assert!(calls.contains(&Call::Status));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_gateway_leaves_unknown() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.fail(Op::Status, "connection refused");
        gateway.fail(Op::Subscribe, "connection refused");
        let view = SessionView::mount(gateway.clone(), &ConsoleSettings::default());
        settle().await;

        let state = view.snapshot();
        assert_eq!(state.status, SessionStatus::Unknown);
        assert!(state.notice.is_some());
        assert_eq!(view.bridge_state(), BridgeState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_everything() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_status(SessionStatus::Checking);
        let view = SessionView::mount(gateway.clone(), &ConsoleSettings::default());
        settle().await;
        view.controller().start_session().await.unwrap();
        let mut sub = view.subscribe(&[Field::Status]);

        view.teardown();
        view.teardown();
        settle().await;
        assert_eq!(view.bridge_state(), BridgeState::Disconnected);
        assert!(!view.supervisor().is_polling());

        let before = gateway.status_calls();
        gateway.push_event("session.status", r#"{"status":"WORKING"}"#);
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gateway.status_calls(), before);
        assert_eq!(view.snapshot().status, SessionStatus::Checking);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_tears_down() {
        let gateway = Arc::new(FakeGateway::new());
        let store = {
            let view = SessionView::mount(gateway.clone(), &ConsoleSettings::default());
            settle().await;
            Arc::clone(view.store())
        };
        assert!(store.is_closed());
    }
}
