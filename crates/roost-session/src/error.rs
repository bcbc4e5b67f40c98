//! Session-core error types.

use thiserror::Error;

/// Errors surfaced by the protocol-client seam.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection handle is no longer open.
    #[error("connection closed")]
    Closed,

    /// A single send or control-state call failed.
    #[error("action failed: {0}")]
    ActionFailed(String),
}

/// Errors that can occur during session orchestration.
///
/// Only the command rejections (`AlreadyActive`, `UnknownIdentity`,
/// `AtCapacity`) ever reach a caller synchronously; everything inside a
/// running session degrades to an error event on the bus.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A live session already exists for this identity.
    #[error("session already active: {0}")]
    AlreadyActive(String),

    /// The identity has no stored credentials.
    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    /// The registry is at its configured session limit.
    #[error("session limit reached ({limit} live sessions)")]
    AtCapacity { limit: usize },

    /// Client-seam error.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Error from the core crate (store, config).
    #[error(transparent)]
    Core(#[from] roost_core::Error),
}

impl From<SessionError> for roost_core::Error {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AlreadyActive(id) => roost_core::Error::AlreadyActive(id),
            SessionError::UnknownIdentity(id) => roost_core::Error::UnknownIdentity(id),
            SessionError::Core(inner) => inner,
            other => roost_core::Error::Session(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Closed;
        assert_eq!(err.to_string(), "connection closed");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::AlreadyActive("steve".to_string());
        assert_eq!(err.to_string(), "session already active: steve");

        let err = SessionError::AtCapacity { limit: 8 };
        assert!(err.to_string().contains("8"));
    }

    #[test]
    fn test_session_error_to_core_error() {
        let err = SessionError::AlreadyActive("steve".to_string());
        let core: roost_core::Error = err.into();
        assert!(matches!(core, roost_core::Error::AlreadyActive(_)));
        assert!(core.is_rejection());

        let err = SessionError::Client(ClientError::Closed);
        let core: roost_core::Error = err.into();
        assert!(matches!(core, roost_core::Error::Session(_)));
    }
}
