//! Error types for the TeamFlow client.

use thiserror::Error;

use crate::entity::ContextType;

/// A shared error type for the entire client.
///
/// Directory operations, chat transport, and command parsing all surface
/// failures through these variants so the navigation loop can apply one
/// propagation policy: `Auth` forces re-login, everything else is printed
/// and the current prompt is shown again.
#[derive(Error, Debug, Clone)]
pub enum TeamFlowError {
    /// Authentication failure (401 or expired token).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("Network error: {0}")]
    Network(String),

    /// Server rejected the request (4xx with a server-supplied message).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found (404, e.g. deleting an already-deleted id).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server-side failure (5xx).
    #[error("Server error: {0}")]
    Server(String),

    /// A child entity cannot be listed or created because its parent kind
    /// has no instances yet. Distinguishable from a plain fetch error so the
    /// caller can tell the user to create the parent first.
    #[error("No {parent} exists to hold a new {child}. Create a {parent} first.")]
    NoParent {
        child: ContextType,
        parent: ContextType,
    },

    /// Chat channel could not be established within the bounded timeout.
    #[error("Chat connection failed: {0}")]
    Connect(String),

    /// An inbound chat frame could not be decoded. Logged and skipped by the
    /// transport; never terminates the channel.
    #[error("Undecodable chat frame: {0}")]
    Decode(String),

    /// Send attempted on a closed or never-opened chat channel.
    #[error("Chat channel is not connected")]
    NotConnected,

    /// Malformed command input; the message is the usage explanation.
    #[error("{0}")]
    Usage(String),

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TeamFlowError {
    /// Creates an Auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a Connect error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    /// Creates a Usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this failure must force a return to the login prompt.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a missing-parent condition.
    pub fn is_no_parent(&self) -> bool {
        matches!(self, Self::NoParent { .. })
    }
}

impl From<serde_json::Error> for TeamFlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A type alias for `Result<T, TeamFlowError>`.
pub type Result<T> = std::result::Result<T, TeamFlowError>;
