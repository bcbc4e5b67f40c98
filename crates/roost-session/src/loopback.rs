//! In-process simulated connector.
//!
//! `LoopbackConnector` stands in for a real protocol client: connections
//! log in and spawn on a script, every action the core performs is recorded
//! with a timestamp, and tests (or an operator dry-run) can inject chat,
//! kick the bot, or sever the link to exercise the lifecycle machinery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::client::{ClientEvent, ClientHandle, ConnectOptions, Connector, Control};
use crate::error::ClientError;

/// One action the core performed on a simulated connection.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    Chat(String),
    Control(Control, bool),
    Look(f32, f32),
    SwingArm,
    Quit,
}

/// A simulated connection handle.
pub struct LoopbackClient {
    username: String,
    open: AtomicBool,
    actions: Mutex<Vec<(Instant, RecordedAction)>>,
    events_tx: mpsc::Sender<ClientEvent>,
}

impl LoopbackClient {
    /// Username this connection was opened with.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// All recorded actions with their (virtual) timestamps.
    pub fn actions_timed(&self) -> Vec<(Instant, RecordedAction)> {
        self.actions.lock().clone()
    }

    /// All recorded actions in order.
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.actions.lock().iter().map(|(_, a)| a.clone()).collect()
    }

    /// Just the chat sends, in order.
    pub fn chats(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|(_, a)| match a {
                RecordedAction::Chat(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Inject a player chat line.
    pub async fn push_chat(&self, username: &str, text: &str) {
        let _ = self
            .events_tx
            .send(ClientEvent::Chat {
                username: username.to_string(),
                text: text.to_string(),
            })
            .await;
    }

    /// Inject a server-relayed message.
    pub async fn push_server_message(&self, text: &str) {
        let _ = self
            .events_tx
            .send(ClientEvent::ServerMessage {
                text: text.to_string(),
            })
            .await;
    }

    /// Simulate the server kicking this bot. Emits `Kicked` then `Ended`.
    pub async fn kick(&self, reason: &str) {
        let _ = self
            .events_tx
            .send(ClientEvent::Kicked {
                reason: reason.to_string(),
            })
            .await;
        self.end(reason).await;
    }

    /// Simulate the connection dropping. Emits `Ended`.
    pub async fn end(&self, reason: &str) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self
            .events_tx
            .send(ClientEvent::Ended {
                reason: reason.to_string(),
            })
            .await;
    }

    /// Mark the link dead without delivering any event, as a stalled
    /// connection would look to the guard checks.
    pub fn sever(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn record(&self, action: RecordedAction) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::Closed);
        }
        self.actions.lock().push((Instant::now(), action));
        Ok(())
    }
}

#[async_trait]
impl ClientHandle for LoopbackClient {
    async fn chat(&self, text: &str) -> Result<(), ClientError> {
        self.record(RecordedAction::Chat(text.to_string()))
    }

    async fn set_control_state(&self, control: Control, active: bool) -> Result<(), ClientError> {
        self.record(RecordedAction::Control(control, active))
    }

    async fn look(&self, yaw: f32, pitch: f32) -> Result<(), ClientError> {
        self.record(RecordedAction::Look(yaw, pitch))
    }

    async fn swing_arm(&self) -> Result<(), ClientError> {
        self.record(RecordedAction::SwingArm)
    }

    async fn quit(&self) -> Result<(), ClientError> {
        // Recording quit on an already-severed link is fine to skip.
        let _ = self.record(RecordedAction::Quit);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Simulated connector for the whole fleet.
#[derive(Default)]
pub struct LoopbackConnector {
    clients: Mutex<HashMap<String, Arc<LoopbackClient>>>,
    refuse: AtomicBool,
    connects: AtomicUsize,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent connection for a username, if any was ever opened.
    pub fn client(&self, username: &str) -> Option<Arc<LoopbackClient>> {
        self.clients.lock().get(username).cloned()
    }

    /// Make subsequent connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Total number of successful connects since creation.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> Result<(Arc<dyn ClientHandle>, mpsc::Receiver<ClientEvent>), ClientError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectFailed("connection refused".to_string()));
        }

        let (events_tx, events_rx) = mpsc::channel(32);
        let client = Arc::new(LoopbackClient {
            username: opts.username.clone(),
            open: AtomicBool::new(true),
            actions: Mutex::new(Vec::new()),
            events_tx: events_tx.clone(),
        });

        // Scripted lifecycle: login then spawn, immediately.
        let _ = events_tx.send(ClientEvent::LoggedIn).await;
        let _ = events_tx.send(ClientEvent::Spawned).await;

        self.clients
            .lock()
            .insert(opts.username, Arc::clone(&client));
        self.connects.fetch_add(1, Ordering::SeqCst);

        Ok((client, events_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(username: &str) -> ConnectOptions {
        ConnectOptions {
            host: "localhost".to_string(),
            port: 25565,
            username: username.to_string(),
            version: "1.20.1".to_string(),
            auth: crate::client::AuthMode::Offline,
            password: None,
            physics: true,
        }
    }

    #[tokio::test]
    async fn test_connect_scripts_login_and_spawn() {
        let connector = LoopbackConnector::new();
        let (client, mut events) = connector.connect(opts("steve")).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), ClientEvent::LoggedIn));
        assert!(matches!(events.recv().await.unwrap(), ClientEvent::Spawned));
        assert!(client.is_open());
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn test_actions_recorded_in_order() {
        let connector = LoopbackConnector::new();
        let (client, _events) = connector.connect(opts("steve")).await.unwrap();

        client.chat("hello").await.unwrap();
        client.set_control_state(Control::Jump, true).await.unwrap();
        client.swing_arm().await.unwrap();

        let recorded = connector.client("steve").unwrap();
        assert_eq!(
            recorded.actions(),
            vec![
                RecordedAction::Chat("hello".to_string()),
                RecordedAction::Control(Control::Jump, true),
                RecordedAction::SwingArm,
            ]
        );
        assert_eq!(recorded.chats(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_actions() {
        let connector = LoopbackConnector::new();
        let (client, mut events) = connector.connect(opts("steve")).await.unwrap();
        events.recv().await.unwrap();
        events.recv().await.unwrap();

        connector.client("steve").unwrap().end("Timed out").await;
        assert!(!client.is_open());
        assert!(matches!(client.chat("late").await, Err(ClientError::Closed)));
        assert!(matches!(
            events.recv().await.unwrap(),
            ClientEvent::Ended { .. }
        ));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let connector = LoopbackConnector::new();
        connector.refuse_connections(true);
        assert!(connector.connect(opts("steve")).await.is_err());
        assert_eq!(connector.connects(), 0);
    }
}
