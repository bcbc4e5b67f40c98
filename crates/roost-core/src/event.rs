//! Session lifecycle and chat event types.
//!
//! Events are fire-and-forget records produced by sessions and fanned out to
//! observers; the core never persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a bot session as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    /// Start accepted, connection attempt pending or in flight
    Connecting,
    /// Logged in to the server
    Connected,
    /// Spawned into the world
    Spawned,
    /// Kicked by the server (termination follows separately)
    Kicked,
    /// Died and respawned
    Died,
    /// Connection fully terminated
    Disconnected,
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Spawned => write!(f, "spawned"),
            Self::Kicked => write!(f, "kicked"),
            Self::Died => write!(f, "died"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// An event emitted by a session, tagged with the identity that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// Lifecycle transition
    Status {
        identity: String,
        status: BotStatus,
        message: String,
    },
    /// Chat line observed by the bot
    Chat {
        identity: String,
        username: String,
        text: String,
    },
    /// Non-fatal failure inside a session
    Error { identity: String, message: String },
    /// The supervisor is about to re-issue a start for this identity
    Reconnecting { identity: String },
}

impl Event {
    /// The identity this event belongs to.
    pub fn identity(&self) -> &str {
        match self {
            Event::Status { identity, .. }
            | Event::Chat { identity, .. }
            | Event::Error { identity, .. }
            | Event::Reconnecting { identity } => identity,
        }
    }

    /// Shorthand for a status event.
    pub fn status(identity: impl Into<String>, status: BotStatus, message: impl Into<String>) -> Self {
        Event::Status {
            identity: identity.into(),
            status,
            message: message.into(),
        }
    }

    /// Shorthand for an error event.
    pub fn error(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Error {
            identity: identity.into(),
            message: message.into(),
        }
    }
}

/// A timestamped event envelope, for observers that want arrival times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    /// When the event was emitted
    pub at: DateTime<Utc>,
    /// The event itself
    #[serde(flatten)]
    pub event: Event,
}

impl TimestampedEvent {
    /// Wrap an event with the current time.
    pub fn now(event: Event) -> Self {
        Self {
            at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&BotStatus::Spawned).unwrap();
        assert_eq!(json, "\"spawned\"");
    }

    #[test]
    fn test_event_identity() {
        let ev = Event::status("steve", BotStatus::Connecting, "Connecting...");
        assert_eq!(ev.identity(), "steve");

        let ev = Event::Reconnecting {
            identity: "alex".to_string(),
        };
        assert_eq!(ev.identity(), "alex");
    }

    #[test]
    fn test_event_json_shape() {
        let ev = Event::Chat {
            identity: "steve".to_string(),
            username: "Server".to_string(),
            text: "hello".to_string(),
        };
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], "chat");
        assert_eq!(value["identity"], "steve");
        assert_eq!(value["username"], "Server");
    }
}
