//! Realtime chat abstractions.
//!
//! The concrete websocket transport lives in `teamflow-chat`; the navigation
//! machine only sees these traits, so chat can be mocked in tests and the
//! wire format stays a configuration detail.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::ContextType;
use crate::error::Result;

/// One chat message, displayed and discarded. No history buffer is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub content: String,
    pub sender_username: String,
    /// Server-supplied timestamp, kept as the string the server sent.
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// Render as shown in the chat transcript.
    pub fn display_line(&self) -> String {
        let timestamp = self.created_at.as_deref().unwrap_or("no timestamp");
        format!("{} ({}): {}", self.sender_username, timestamp, self.content)
    }
}

/// Callback invoked on the background receive task for every decoded inbound
/// message.
pub type OnMessage = Arc<dyn Fn(ChatMessage) + Send + Sync>;

/// An open bidirectional channel scoped to one context entity.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Sends one outbound message. Returns `NotConnected` once the channel
    /// has been closed.
    async fn send(&self, content: &str) -> Result<()>;

    /// Closes the channel and releases the background receive task.
    /// Idempotent: closing an already-closed channel is a no-op.
    async fn close(&self);
}

/// Opens chat channels. Exactly one channel is open at a time; the
/// navigation machine closes the previous one before opening the next.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    /// Establishes a channel for the given context, delivering inbound
    /// messages to `on_message` from a background task. Blocks up to the
    /// configured timeout waiting for readiness; on timeout or handshake
    /// failure, returns a `Connect` error with all partial resources
    /// released.
    ///
    /// Token and context arrive as parameters rather than via the session
    /// store, so a `/back` during the connect attempt cannot race it.
    async fn open(
        &self,
        context_type: ContextType,
        context_id: Uuid,
        token: &str,
        on_message: OnMessage,
    ) -> Result<Box<dyn ChatChannel>>;
}
