//! Error types for Roost.
//!
//! Command rejections are the only errors callers ever see synchronously;
//! everything that happens inside a running session degrades to an `Error`
//! event on the bus instead of propagating.

use thiserror::Error;

/// Result type alias using the Roost error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Roost.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A live session already exists for this identity
    #[error("Session already active for '{0}'")]
    AlreadyActive(String),

    /// No stored credentials for this identity
    #[error("Unknown identity '{0}'")]
    UnknownIdentity(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Store error (persisted operator data)
    #[error("Store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your config file at ~/.config/roost/config.toml"),
            Error::AlreadyActive(_) => Some("Stop the running session first with 'roost stop'"),
            Error::UnknownIdentity(_) => {
                Some("Add the account first with 'roost accounts add <name>'")
            }
            Error::Store(_) => Some("Check the data directory is writable"),
            _ => None,
        }
    }

    /// True for errors that reject a command without touching any state.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::AlreadyActive(_) | Error::UnknownIdentity(_))
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_active_is_rejection() {
        let err = Error::AlreadyActive("steve".to_string());
        assert!(err.is_rejection());
        assert!(err.to_string().contains("steve"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_unknown_identity_display() {
        let err = Error::UnknownIdentity("alex".to_string());
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Unknown identity 'alex'");
    }

    #[test]
    fn test_io_error_is_not_rejection() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_rejection());
    }
}
