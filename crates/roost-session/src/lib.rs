//! # roost-session
//!
//! The session lifecycle core for Roost.
//!
//! This crate concurrently manages an arbitrary number of independent,
//! long-lived, failure-prone protocol sessions. Each session is one tokio
//! task owning its connection handle and timer set; all commands, timer
//! ticks, and protocol callbacks for a session are serialized through that
//! task's inbound channel, so sessions need no internal locking and cannot
//! interfere with one another. The registry is the single shared table and
//! the only cross-session synchronization point.
//!
//! Entry point: [`FleetManager`].

pub mod client;
pub mod error;
pub mod events;
pub mod loopback;
pub mod manager;
pub mod registry;
pub mod session;
pub mod supervisor;
mod timers;

pub use client::{AuthMode, ClientEvent, ClientHandle, ConnectOptions, Connector, Control};
pub use error::{ClientError, SessionError};
pub use events::EventBus;
pub use loopback::{LoopbackClient, LoopbackConnector, RecordedAction};
pub use manager::FleetManager;
pub use registry::Registry;
pub use session::{AntiIdleConfig, BurstConfig, SessionConfig, SessionHandle};
pub use supervisor::ReconnectSupervisor;
