//! The single mutable source of truth for one view.
//!
//! All mutation goes through [`SessionStore::apply`] or
//! [`SessionStore::update`]; both run under one lock so a patch is observed
//! atomically. Subscribers get one [`FieldChange`] per changed field per
//! patch, in [`Field::ALL`] order, and nothing when a patch changes nothing.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use wa_core::{Field, UiPatch, UiState};

/// One field-change notification with the state right after the patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    /// Field that changed.
    pub field: Field,
    /// Snapshot after the patch that changed it.
    pub state: UiState,
}

struct Subscriber {
    field: Field,
    tx: mpsc::UnboundedSender<FieldChange>,
}

struct Inner {
    state: UiState,
    subscribers: Vec<Subscriber>,
    closed: bool,
}

/// Shared UI state with per-field change notifications.
pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Fresh store in the mount state (status `Checking`).
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: UiState::default(),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> UiState {
        self.inner.lock().state.clone()
    }

    /// Apply a patch atomically and notify subscribers of changed fields.
    ///
    /// Returns the changed fields. A closed store ignores patches.
    pub fn apply(&self, patch: UiPatch) -> Vec<Field> {
        let mut inner = self.inner.lock();
        Self::apply_locked(&mut inner, patch)
    }

    /// Compute a patch from the current state and apply it under the same
    /// lock. `None` leaves the state untouched.
    pub fn update<F>(&self, f: F) -> Vec<Field>
    where
        F: FnOnce(&UiState) -> Option<UiPatch>,
    {
        let mut inner = self.inner.lock();
        match f(&inner.state) {
            Some(patch) => Self::apply_locked(&mut inner, patch),
            None => Vec::new(),
        }
    }

    /// Subscribe to changes of one field.
    pub fn subscribe(&self, field: Field) -> FieldSubscription {
        self.subscribe_many(&[field])
    }

    /// Subscribe to several fields through one receiver.
    pub fn subscribe_many(&self, fields: &[Field]) -> FieldSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if !inner.closed {
            inner.subscribers.extend(fields.iter().map(|&field| Subscriber {
                field,
                tx: tx.clone(),
            }));
        }
        FieldSubscription { rx }
    }

    /// Mark an operation as in flight.
    ///
    /// Returns `None` when another operation already holds the flag. The
    /// returned guard clears `is_loading` when dropped, whatever the outcome.
    pub fn begin_operation(self: &Arc<Self>) -> Option<OperationGuard> {
        let mut inner = self.inner.lock();
        if inner.state.is_loading || inner.closed {
            return None;
        }
        let _ = Self::apply_locked(&mut inner, UiPatch::new().loading(true));
        Some(OperationGuard {
            store: Arc::clone(self),
        })
    }

    /// Drop all subscribers and ignore further patches.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.subscribers.clear();
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    fn apply_locked(inner: &mut Inner, patch: UiPatch) -> Vec<Field> {
        if inner.closed {
            debug!("store closed, patch ignored");
            return Vec::new();
        }
        let changed = inner.state.apply(patch);
        for field in &changed {
            let state = &inner.state;
            inner.subscribers.retain(|sub| {
                sub.field != *field
                    || sub
                        .tx
                        .send(FieldChange {
                            field: *field,
                            state: state.clone(),
                        })
                        .is_ok()
            });
        }
        changed
    }
}

/// Receiver side of a store subscription.
pub struct FieldSubscription {
    rx: mpsc::UnboundedReceiver<FieldChange>,
}

impl FieldSubscription {
    /// Next change, or `None` once the store is closed.
    pub async fn recv(&mut self) -> Option<FieldChange> {
        self.rx.recv().await
    }

    /// Next queued change without waiting.
    pub fn try_recv(&mut self) -> Option<FieldChange> {
        self.rx.try_recv().ok()
    }

    /// Drain all queued changes.
    pub fn drain(&mut self) -> Vec<FieldChange> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Holds `is_loading` for the span of one user operation.
pub struct OperationGuard {
    store: Arc<SessionStore>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let _ = self.store.apply(UiPatch::new().loading(false));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
