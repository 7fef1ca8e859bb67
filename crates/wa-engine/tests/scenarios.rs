//! End-to-end session scenarios against the in-memory gateway.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use wa_core::{Field, NoticeKind, SessionStatus, UiPatch};
use wa_engine::{BridgeState, SessionView};
use wa_engine::testing::{Call, FakeGateway};
use wa_settings::ConsoleSettings;

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn mounted(gateway: &Arc<FakeGateway>) -> SessionView {
    let view = SessionView::mount(gateway.clone(), &ConsoleSettings::default());
    settle().await;
    gateway.reset_calls();
    view
}

#[tokio::test(start_paused = true)]
async fn scan_qr_event_loads_qr_for_default_session() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;

    gateway.push_event("session.status", r#"{"status":"SCAN_QR_CODE","session":"default"}"#);
    settle().await;

    let state = view.snapshot();
    assert_eq!(state.status, SessionStatus::AwaitingQrScan);
    assert_eq!(gateway.qr_requests(), vec!["default".to_string()]);
    assert!(state.show_qr_code);
    assert!(state.qr.unwrap().image_ref.is_embedded());
}

#[tokio::test(start_paused = true)]
async fn start_cycle_until_connected() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;
    let mut status_changes = view.subscribe(&[Field::Status]);

    gateway.set_status(SessionStatus::AwaitingQrScan);
    view.controller().start_session().await.unwrap();

    // grace check and first poll at 3s
    time::sleep(Duration::from_millis(3_100)).await;
    let state = view.snapshot();
    assert_eq!(state.status, SessionStatus::AwaitingQrScan);
    assert!(state.show_qr_code);
    assert_eq!(gateway.qr_requests().len(), 1);

    gateway.push_event("session.status", r#"{"status":"WORKING"}"#);
    settle().await;
    let state = view.snapshot();
    assert_eq!(state.status, SessionStatus::Working);
    assert!(!state.show_qr_code);
    assert!(state.qr.is_none());

    let polls_before = gateway.status_calls();
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls(), polls_before);
    assert_eq!(gateway.qr_requests().len(), 1);
    assert!(!view.supervisor().is_polling());
    assert!(!view.supervisor().is_refreshing_qr());

    let seen: Vec<_> = status_changes.drain().into_iter().map(|c| c.state.status).collect();
    assert_eq!(seen, vec![SessionStatus::AwaitingQrScan, SessionStatus::Working]);
}

#[tokio::test(start_paused = true)]
async fn successful_send_resets_form() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;

    view.controller()
        .send_message("081234567890", "Halo dari console")
        .await
        .unwrap();

    assert_eq!(
        gateway.sent(),
        vec![("6281234567890".to_string(), "Halo dari console".to_string())]
    );
    let state = view.snapshot();
    assert_eq!(state.response_type(), Some(NoticeKind::Success));
    assert_eq!(state.phone_number, "");
    assert_eq!(state.message, "");
}

#[tokio::test(start_paused = true)]
async fn invalid_number_never_reaches_gateway() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;

    assert!(view.controller().send_message("123", "hi").await.is_err());

    assert!(gateway.calls().is_empty());
    let state = view.snapshot();
    assert_eq!(state.response_type(), Some(NoticeKind::Error));
    assert!(!state.is_loading);
}

#[tokio::test(start_paused = true)]
async fn refresh_tick_while_working_fetches_nothing() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;

    gateway.push_event("session.qr", r#"{"qr":"iVBORw0KGgo="}"#);
    settle().await;
    assert!(view.supervisor().is_refreshing_qr());

    // status changes without going through the supervisor, so only the
    // tick-time guard can stop the refresh
    let _ = view
        .store()
        .apply(UiPatch::new().status(SessionStatus::Working));
    time::sleep(Duration::from_secs(31)).await;

    assert!(gateway.qr_requests().is_empty());
    assert!(!view.supervisor().is_refreshing_qr());
}

#[tokio::test(start_paused = true)]
async fn notices_expire() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;

    let _ = view.controller().ping().await.unwrap();
    assert!(view.snapshot().notice.is_some());

    time::sleep(Duration::from_millis(5_100)).await;
    assert!(view.snapshot().notice.is_none());
}

#[tokio::test(start_paused = true)]
async fn stream_loss_falls_back_to_polling() {
    let gateway = Arc::new(FakeGateway::new());
    let view = mounted(&gateway).await;
    gateway.close_events();
    settle().await;
    assert_eq!(view.bridge_state(), BridgeState::Disconnected);

    gateway.set_status(SessionStatus::Checking);
    view.controller().start_session().await.unwrap();
    time::sleep(Duration::from_millis(6_100)).await;
    gateway.set_status(SessionStatus::Working);
    time::sleep(Duration::from_secs(3)).await;

    assert_eq!(view.snapshot().status, SessionStatus::Working);
    assert!(!gateway.calls().contains(&Call::Subscribe));
}
