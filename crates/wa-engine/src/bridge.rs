//! Push-channel consumer.
//!
//! Owns the single event subscription of a view. Decoded events are turned
//! into store patches through the same paths the supervisor uses, so a
//! status seen on the stream and a status seen by a poll are handled
//! identically. There is no reconnect: when the stream ends or fails the
//! bridge reports `Disconnected` and the polling fallback carries on.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use wa_core::text::truncate_str;
use wa_core::{EngineError, QrArtifact, QrPayload, UiPatch};
use wa_gateway::{GatewayClient, GatewayEvent, RawEvent, decode_event};

use crate::store::SessionStore;
use crate::supervisor::PollingSupervisor;

/// Longest raw payload excerpt written to logs.
const LOG_PREVIEW: usize = 200;

/// Connection state of the push channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    /// Not subscribed (initial, ended, or failed).
    Disconnected,
    /// Subscription requested.
    Connecting,
    /// Receiving events.
    Connected,
}

/// Applies decoded push events to the store.
pub struct RealtimeEventBridge {
    gateway: Arc<dyn GatewayClient>,
    store: Arc<SessionStore>,
    supervisor: PollingSupervisor,
    state: watch::Sender<BridgeState>,
}

impl RealtimeEventBridge {
    /// Bridge for one view.
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        store: Arc<SessionStore>,
        supervisor: PollingSupervisor,
    ) -> Self {
        let (state, _) = watch::channel(BridgeState::Disconnected);
        Self {
            gateway,
            store,
            supervisor,
            state,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    /// Observe connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<BridgeState> {
        self.state.subscribe()
    }

    /// Subscribe and consume events until the stream ends or `cancel` fires.
    #[instrument(skip_all, name = "realtime_bridge")]
    pub async fn run(&self, cancel: CancellationToken) {
        self.set_state(BridgeState::Connecting);

        let subscribed = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.set_state(BridgeState::Disconnected);
                return;
            }
            result = self.gateway.subscribe_events() => result,
        };
        let mut stream = match subscribed {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "event subscription failed");
                self.set_state(BridgeState::Disconnected);
                return;
            }
        };

        self.set_state(BridgeState::Connected);
        info!("event stream connected");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("event stream cancelled");
                    break;
                }
                item = stream.next() => match item {
                    Some(Ok(raw)) => self.handle(&raw),
                    Some(Err(e)) => {
                        warn!(error = %e, "event stream failed");
                        break;
                    }
                    None => {
                        info!("event stream ended");
                        break;
                    }
                },
            }
        }

        self.set_state(BridgeState::Disconnected);
    }

    /// Decode and apply one raw event. Malformed events are logged and
    /// dropped.
    pub fn handle(&self, raw: &RawEvent) {
        match decode_event(&raw.event, &raw.data) {
            Ok(Some(event)) => self.apply(event),
            Ok(None) => debug!(event = %raw.event, "ignoring unknown event"),
            Err(e) => warn!(
                event = %raw.event,
                error = %e,
                data = truncate_str(&raw.data, LOG_PREVIEW),
                "dropping malformed event"
            ),
        }
    }

    fn apply(&self, event: GatewayEvent) {
        debug!(event = event.event_type(), "event");
        match event {
            GatewayEvent::SessionStatus { status, session } => {
                self.supervisor.observe_status(status, session);
            }
            GatewayEvent::SessionQr { qr, .. } => {
                match QrArtifact::from_payload(QrPayload::Text(qr)) {
                    Ok(artifact) => self.supervisor.present_qr(artifact),
                    Err(e) => self.supervisor.reject_qr(&EngineError::from(e)),
                }
            }
            GatewayEvent::Message(message) => {
                let _ = self.store.apply(UiPatch::new().last_message(message));
            }
        }
    }

    fn set_state(&self, state: BridgeState) {
        let _ = self.state.send_replace(state);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
