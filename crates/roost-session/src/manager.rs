//! The fleet manager: the command surface of the session core.
//!
//! Commands come in here (`start`, `stop`, `send_chat`, `toggle_spam`),
//! events go out through [`FleetManager::subscribe`]. The manager reads the
//! store at each start to build the session's config snapshot, and owns the
//! registry, event bus, and reconnect supervisor that sessions share.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use roost_core::{Config, Event, Store};
use tokio::sync::broadcast;

use crate::client::Connector;
use crate::error::SessionError;
use crate::events::EventBus;
use crate::registry::Registry;
use crate::session::{self, SessionConfig, SessionHandle, SessionMsg, SessionParams};
use crate::supervisor::ReconnectSupervisor;

/// Orchestrates every live session in the process.
pub struct FleetManager {
    config: Config,
    store: Store,
    connector: Arc<dyn Connector>,
    registry: Arc<Registry>,
    bus: EventBus,
    supervisor: Arc<ReconnectSupervisor>,
}

impl FleetManager {
    /// Create a manager around a store and a connector.
    ///
    /// Returns an `Arc` because the reconnect supervisor keeps a weak
    /// back-reference for re-issuing starts.
    pub fn new(config: Config, store: Store, connector: Arc<dyn Connector>) -> Arc<Self> {
        let bus = EventBus::new(config.limits.event_buffer);
        let registry = Arc::new(Registry::new(config.limits.max_sessions));

        Arc::new_cyclic(|weak| Self {
            supervisor: Arc::new(ReconnectSupervisor::new(weak.clone(), bus.clone())),
            registry,
            bus,
            store,
            connector,
            config,
        })
    }

    /// Start a session for a stored identity.
    ///
    /// Fails with `AlreadyActive` when a live session exists for it and
    /// `UnknownIdentity` when no credentials are on file. The config
    /// snapshot is taken here; later store edits do not affect the running
    /// session.
    ///
    /// Returns a boxed future: session tasks await the supervisor, whose
    /// tasks await `start`, and with opaque async-fn futures in every link
    /// that chain would be a Send-inference cycle rustc cannot resolve.
    pub fn start<'a>(
        &'a self,
        identity: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + 'a>> {
        Box::pin(self.start_inner(identity))
    }

    async fn start_inner(&self, identity: &str) -> Result<(), SessionError> {
        let account = self
            .store
            .account(identity)
            .await
            .map_err(SessionError::Core)?
            .ok_or_else(|| SessionError::UnknownIdentity(identity.to_string()))?;
        let info = self.store.server_info().await.map_err(SessionError::Core)?;
        let settings = self.store.settings().await.map_err(SessionError::Core)?;

        let config = SessionConfig::assemble(&info, &settings, &account);
        session::launch(SessionParams {
            identity: identity.to_string(),
            config,
            connector: Arc::clone(&self.connector),
            registry: Arc::clone(&self.registry),
            bus: self.bus.clone(),
            supervisor: Arc::clone(&self.supervisor),
            command_buffer: self.config.limits.command_buffer,
        })
        .await?;

        Ok(())
    }

    /// Stop a session. Idempotent; always succeeds. Suppresses any pending
    /// or future reconnect for this termination.
    pub async fn stop(&self, identity: &str) {
        self.supervisor.cancel(identity).await;
        if let Some(handle) = self.registry.lookup(identity).await {
            handle.stop().await;
            info!(identity = %identity, "Stopped session");
        } else {
            debug!(identity = %identity, "Stop for idle identity ignored");
        }
        // A disconnect already queued when the stop arrived schedules its
        // reconnect after the cancel above. That schedule runs before the
        // session task exits, and `handle.stop()` returns only after the
        // task has, so this sweep sees it.
        self.supervisor.cancel(identity).await;
    }

    /// Forward a chat line to a session. Fire-and-forget: silently ignored
    /// when the identity is idle or the connection is not open.
    pub async fn send_chat(&self, identity: &str, text: &str) {
        if let Some(handle) = self.registry.lookup(identity).await {
            handle.send(SessionMsg::Chat(text.to_string())).await;
        }
    }

    /// Arm or clear a session's spam loop. Fire-and-forget.
    pub async fn toggle_spam(&self, identity: &str, text: &str, interval_secs: u64, enable: bool) {
        if let Some(handle) = self.registry.lookup(identity).await {
            handle
                .send(SessionMsg::ToggleSpam {
                    text: text.to_string(),
                    interval: Duration::from_secs(interval_secs.max(1)),
                    enable,
                })
                .await;
        }
    }

    /// Snapshot of identities with live sessions.
    pub async fn list_active(&self) -> Vec<String> {
        self.registry.list_active().await
    }

    /// Look up the live session handle for an identity.
    pub async fn session(&self, identity: &str) -> Option<SessionHandle> {
        self.registry.lookup(identity).await
    }

    /// Subscribe to the fleet's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The store this fleet reads its configuration from.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The reconnect supervisor (exposed for observability).
    pub fn supervisor(&self) -> &ReconnectSupervisor {
        &self.supervisor
    }

    /// Stop every session and cancel every pending reconnect.
    pub async fn shutdown(&self) {
        info!("Shutting down fleet");
        self.supervisor.cancel_all().await;
        for identity in self.registry.list_active().await {
            self.stop(&identity).await;
        }
    }
}
