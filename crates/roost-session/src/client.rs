//! The narrow seam to the underlying game-protocol client.
//!
//! The session core never speaks the wire protocol itself. It drives an
//! opaque [`ClientHandle`] (chat, control states, look, swing, quit) and
//! consumes the [`ClientEvent`] stream the connection produces. Anything
//! that implements [`Connector`] can back a fleet: the in-process
//! [`crate::loopback`] simulator, or a real protocol client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// Authentication path for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Join with the bare username, no credential exchange
    Offline,
    /// Full account authentication
    Authenticated,
}

/// Parameters for opening one connection, derived from the config snapshot.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Server hostname or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Account username
    pub username: String,
    /// Protocol version string
    pub version: String,
    /// Authentication path
    pub auth: AuthMode,
    /// Password, set only when authenticated and one is on file
    pub password: Option<String>,
    /// Enable client-side physics
    pub physics: bool,
}

/// A movement control the core can assert or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Forward,
    Jump,
    Sneak,
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Jump => write!(f, "jump"),
            Self::Sneak => write!(f, "sneak"),
        }
    }
}

/// Asynchronous lifecycle and chat callbacks from one connection.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Login completed
    LoggedIn,
    /// Spawned into the world
    Spawned,
    /// Chat line from a named player
    Chat { username: String, text: String },
    /// Server-relayed message with no player attribution
    ServerMessage { text: String },
    /// Kicked by the server; an `Ended` follows
    Kicked { reason: String },
    /// Died and respawned
    Died,
    /// Non-fatal connection error
    Error { message: String },
    /// The connection fully terminated
    Ended { reason: String },
}

/// Opens connections. One connector serves the whole fleet.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection and return its handle plus its event stream.
    ///
    /// The receiver yields events in protocol order for this connection;
    /// the channel closing is equivalent to an `Ended` event.
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> Result<(Arc<dyn ClientHandle>, mpsc::Receiver<ClientEvent>), ClientError>;
}

/// Handle to one open connection, exclusively owned by its session.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Send a chat message verbatim.
    async fn chat(&self, text: &str) -> Result<(), ClientError>;

    /// Assert or release a movement control.
    async fn set_control_state(&self, control: Control, active: bool) -> Result<(), ClientError>;

    /// Set the look direction. Yaw in `[0, 2π)`, pitch in `[-π/2, π/2]`.
    async fn look(&self, yaw: f32, pitch: f32) -> Result<(), ClientError>;

    /// Trigger a single arm swing.
    async fn swing_arm(&self) -> Result<(), ClientError>;

    /// Request graceful disconnect.
    async fn quit(&self) -> Result<(), ClientError>;

    /// Whether the connection is still open. Checked before every timer
    /// action so nothing leaks onto a dead connection.
    fn is_open(&self) -> bool;
}
