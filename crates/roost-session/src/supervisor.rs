//! Auto-reconnect supervision.
//!
//! When a session terminates without an explicit stop, the supervisor
//! schedules a fresh, fully independent `start` for that identity after the
//! configured delay — decoupled from the dead session's lifetime. A start
//! that loses to a manual restart (`AlreadyActive`) is an ignorable no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use roost_core::Event;

use crate::error::SessionError;
use crate::events::EventBus;
use crate::manager::FleetManager;

struct PendingAttempt {
    token: u64,
    task: JoinHandle<()>,
}

/// Schedules one pending reconnect attempt per identity.
pub struct ReconnectSupervisor {
    manager: Weak<FleetManager>,
    bus: EventBus,
    pending: Mutex<HashMap<String, PendingAttempt>>,
    // Distinguishes an attempt from the one that replaced it, so a finished
    // task only ever removes its own entry.
    next_token: AtomicU64,
}

impl ReconnectSupervisor {
    pub(crate) fn new(manager: Weak<FleetManager>, bus: EventBus) -> Self {
        Self {
            manager,
            bus,
            pending: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// Schedule a reconnect attempt for `identity` after `delay`, replacing
    /// any attempt already pending for it. The entry removes itself once the
    /// attempt has run.
    pub async fn schedule(self: &Arc<Self>, identity: String, delay: Duration) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let supervisor = Arc::clone(self);
        let manager = self.manager.clone();
        let bus = self.bus.clone();
        let task_identity = identity.clone();

        info!(identity = %identity, delay = ?delay, "Scheduling reconnect");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(manager) = manager.upgrade() {
                bus.emit(Event::Reconnecting {
                    identity: task_identity.clone(),
                });
                match manager.start(&task_identity).await {
                    Ok(()) => {}
                    Err(SessionError::AlreadyActive(_)) => {
                        debug!(identity = %task_identity, "Reconnect superseded by a live session");
                    }
                    Err(e) => {
                        warn!(identity = %task_identity, error = %e, "Reconnect attempt failed");
                    }
                }
            }

            let mut pending = supervisor.pending.lock().await;
            if pending.get(&task_identity).map(|p| p.token) == Some(token) {
                pending.remove(&task_identity);
            }
        });

        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.insert(identity, PendingAttempt { token, task }) {
            old.task.abort();
        }
    }

    /// Cancel the pending attempt for an identity, if any. Called on
    /// explicit stop so a stopped bot stays stopped.
    pub async fn cancel(&self, identity: &str) {
        if let Some(attempt) = self.pending.lock().await.remove(identity) {
            attempt.task.abort();
            debug!(identity = %identity, "Cancelled pending reconnect");
        }
    }

    /// Cancel every pending attempt.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, attempt) in pending.drain() {
            attempt.task.abort();
        }
    }

    /// Whether an attempt is pending for this identity.
    pub async fn has_pending(&self, identity: &str) -> bool {
        self.pending
            .lock()
            .await
            .get(identity)
            .map(|p| !p.task.is_finished())
            .unwrap_or(false)
    }
}
