//! Chat payload encoding shared by both transports.
//!
//! Outbound messages are always `{"content": "..."}`. Inbound payloads are
//! the server's full message object; everything beyond sender, timestamp and
//! content is ignored.

use serde::Deserialize;

use teamflow_core::chat::ChatMessage;
use teamflow_core::error::{Result, TeamFlowError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    sender: Option<InboundSender>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundSender {
    #[serde(default)]
    username: Option<String>,
}

/// Serializes one outbound chat message body.
pub fn encode_outbound(content: &str) -> String {
    serde_json::json!({ "content": content }).to_string()
}

/// Decodes an inbound payload into a [`ChatMessage`]. A missing sender is
/// rendered as "Unknown" rather than dropping the message.
pub fn decode_inbound(payload: &str) -> Result<ChatMessage> {
    let message: InboundMessage = serde_json::from_str(payload)
        .map_err(|e| TeamFlowError::Decode(format!("{e}: {payload}")))?;
    Ok(ChatMessage {
        content: message.content,
        sender_username: message
            .sender
            .and_then(|s| s.username)
            .unwrap_or_else(|| "Unknown".to_string()),
        created_at: message.created_at,
    })
}
