/// Error types for social-sync
///
/// Every failure resolves to a message the user can act on. Only
/// `SessionInvalid` causes navigation.
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session is not valid")]
    SessionInvalid,

    /// Server answered with `success: false`; the message is shown verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A {0} request for this post is already in flight")]
    InFlight(&'static str),

    #[error("View was closed before the response arrived")]
    ViewGone,

    #[error("Response superseded by a newer request")]
    Superseded,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No async runtime available: {0}")]
    Runtime(String),
}

/// Coarse classification used by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or timeout; control stays usable for a manual retry
    Transient,
    /// Blocked before any network call
    Validation,
    /// Redirect to login
    SessionInvalid,
    /// Server refused the operation
    Rejected,
    /// Nothing to show the user (duplicate submit, dead view)
    Suppressed,
    Internal,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorKind::Transient,
            Self::Validation(_) => ErrorKind::Validation,
            Self::SessionInvalid => ErrorKind::SessionInvalid,
            Self::Rejected(_) | Self::NotFound(_) => ErrorKind::Rejected,
            Self::InFlight(_) | Self::ViewGone | Self::Superseded => ErrorKind::Suppressed,
            Self::Decode(_) | Self::Config(_) | Self::Runtime(_) => ErrorKind::Internal,
        }
    }

    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid)
    }

    /// Toast text for this error
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error, please try again.".to_string(),
            Self::Timeout(_) => "The server took too long to respond, please try again.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::SessionInvalid => "Your session has expired, please log in again.".to_string(),
            Self::Rejected(msg) => msg.clone(),
            Self::NotFound(what) => format!("{} was not found.", what),
            Self::InFlight(_) | Self::ViewGone | Self::Superseded => String::new(),
            Self::Decode(_) | Self::Config(_) | Self::Runtime(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

/// Result type alias for client operations
pub type SyncResult<T> = Result<T, SyncError>;
