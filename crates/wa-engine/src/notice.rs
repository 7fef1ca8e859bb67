//! Auto-expiring notices.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::debug;
use wa_core::{Notice, NoticeKind, UiPatch};

use crate::scheduler::{ScheduledTask, TaskSlot};
use crate::store::SessionStore;

/// Posts notices into the store and owns the single expiry timer.
///
/// A new notice supersedes the previous one and replaces its expiry. The
/// expiry only clears the notice it was scheduled for.
pub struct NoticeBoard {
    store: Arc<SessionStore>,
    ttl: Duration,
    expiry: TaskSlot,
    /// Last issued id. Held while a post applies its notice and installs its
    /// expiry, so the installed expiry always belongs to the visible notice.
    last_id: Mutex<u64>,
}

impl NoticeBoard {
    /// Board writing into `store`, notices living for `ttl`.
    pub fn new(store: Arc<SessionStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            expiry: TaskSlot::new("notice_expiry"),
            last_id: Mutex::new(0),
        }
    }

    /// Post a success notice.
    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.post(NoticeKind::Success, text.into())
    }

    /// Post an error notice.
    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.post(NoticeKind::Error, text.into())
    }

    /// Post a notice and (re)schedule its expiry. Returns the notice id.
    pub fn post(&self, kind: NoticeKind, text: String) -> u64 {
        let mut last_id = self.last_id.lock();
        *last_id += 1;
        let id = *last_id;
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or_else(|_| TimeDelta::zero());
        debug!(id, kind = kind.as_str(), %text, "notice");
        let _ = self.store.apply(UiPatch::new().notice(Notice {
            id,
            text,
            kind,
            expires_at: Utc::now() + ttl,
        }));

        let store = Arc::clone(&self.store);
        self.expiry.replace(ScheduledTask::delayed(
            "notice_expiry",
            self.ttl,
            async move {
                let _ = store.update(|state| {
                    let current = state.notice.as_ref().map(|n| n.id);
                    (current == Some(id)).then(|| UiPatch::new().clear_notice())
                });
            },
        ));
        id
    }

    /// Cancel the pending expiry (teardown).
    pub fn cancel(&self) {
        self.expiry.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn board() -> (Arc<SessionStore>, NoticeBoard) {
        let store = Arc::new(SessionStore::new());
        let board = NoticeBoard::new(Arc::clone(&store), Duration::from_secs(5));
        (store, board)
    }

    #[tokio::test(start_paused = true)]
    async fn notice_expires_after_ttl() {
        let (store, board) = board();
        let _ = board.success("Session started");
        assert_eq!(store.snapshot().response_message(), "Session started");

        time::sleep(Duration::from_millis(4_900)).await;
        assert!(store.snapshot().notice.is_some());
        time::sleep(Duration::from_millis(200)).await;
        assert!(store.snapshot().notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn superseding_notice_gets_full_ttl() {
        let (store, board) = board();
        let _ = board.success("first");
        time::sleep(Duration::from_secs(4)).await;
        let second = board.error("second");

        time::sleep(Duration::from_secs(2)).await;
        let state = store.snapshot();
        assert_eq!(state.notice.as_ref().map(|n| n.id), Some(second));
        assert_eq!(state.response_type(), Some(NoticeKind::Error));

        time::sleep(Duration::from_secs(4)).await;
        assert!(store.snapshot().notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_keeps_notice() {
        let (store, board) = board();
        let _ = board.error("boom");
        board.cancel();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.snapshot().response_message(), "boom");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_posts_never_leave_a_sticky_notice() {
        let store = Arc::new(SessionStore::new());
        let board = Arc::new(NoticeBoard::new(
            Arc::clone(&store),
            Duration::from_millis(20),
        ));

        for round in 0..50 {
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let posters: Vec<_> = (0..2)
                .map(|n| {
                    let board = Arc::clone(&board);
                    let barrier = Arc::clone(&barrier);
                    tokio::task::spawn_blocking(move || {
                        let _ = barrier.wait();
                        let _ = board.success(format!("round {round} poster {n}"));
                    })
                })
                .collect();
            for poster in posters {
                poster.await.unwrap();
            }

            time::sleep(Duration::from_millis(80)).await;
            assert!(
                store.snapshot().notice.is_none(),
                "notice still visible after ttl in round {round}"
            );
        }
    }

    #[tokio::test]
    async fn ids_increase() {
        let (_store, board) = board();
        let a = board.success("a");
        let b = board.success("b");
        assert!(b > a);
    }
}
