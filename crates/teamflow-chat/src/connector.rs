//! Establishes chat channels over websockets.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::debug;
use uuid::Uuid;

use teamflow_core::chat::{ChatChannel, ChatConnector, OnMessage};
use teamflow_core::config::{ChatTransport, ClientConfig};
use teamflow_core::entity::ContextType;
use teamflow_core::error::{Result, TeamFlowError};

use crate::channel::{SocketChannel, WireFormat, WsSink, WsStream};
use crate::stomp;

/// Where a channel connects and how it frames payloads once open.
#[derive(Debug, Clone)]
struct Target {
    url: String,
    format: WireFormat,
    /// STOMP subscription destination; `None` for the raw transport, where
    /// the per-context path already scopes the socket.
    subscribe: Option<String>,
}

/// Opens websocket chat channels using the configured transport.
pub struct WebSocketConnector {
    ws_base_url: String,
    transport: ChatTransport,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            ws_base_url: config.ws_base_url.trim_end_matches('/').to_string(),
            transport: config.chat_transport,
            connect_timeout: config.connect_timeout(),
        }
    }

    fn target(&self, context_type: ContextType, context_id: Uuid) -> Target {
        let segment = context_type.chat_segment();
        match self.transport {
            ChatTransport::RawSocket => Target {
                url: format!("{}/{segment}/{context_id}", self.ws_base_url),
                format: WireFormat::Raw,
                subscribe: None,
            },
            ChatTransport::SubscribePublish => Target {
                url: self.ws_base_url.clone(),
                format: WireFormat::SubscribePublish {
                    publish: format!("/app/chat/{segment}/{context_id}"),
                },
                subscribe: Some(format!("/topic/chat/{segment}/{context_id}")),
            },
        }
    }
}

#[async_trait]
impl ChatConnector for WebSocketConnector {
    async fn open(
        &self,
        context_type: ContextType,
        context_id: Uuid,
        token: &str,
        on_message: OnMessage,
    ) -> Result<Box<dyn ChatChannel>> {
        let target = self.target(context_type, context_id);
        debug!(url = %target.url, "opening chat channel");
        let channel = timeout(self.connect_timeout, establish(target, token, on_message))
            .await
            .map_err(|_| {
                TeamFlowError::connect(format!(
                    "timed out after {}s connecting to {context_type} chat",
                    self.connect_timeout.as_secs()
                ))
            })??;
        Ok(Box::new(channel))
    }
}

/// Connects, runs any handshake the transport needs, and hands the socket to
/// the channel's background task. Failing anywhere here drops the socket, so
/// a timed-out attempt leaves nothing behind.
async fn establish(target: Target, token: &str, on_message: OnMessage) -> Result<SocketChannel> {
    let mut request = target
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| TeamFlowError::connect(e.to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| TeamFlowError::connect(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (socket, _) = connect_async(request)
        .await
        .map_err(|e| TeamFlowError::connect(e.to_string()))?;
    let (mut sink, mut stream) = socket.split();

    if let Some(destination) = &target.subscribe {
        stomp_handshake(&mut sink, &mut stream, token, destination).await?;
    }
    Ok(SocketChannel::spawn(sink, stream, target.format, on_message))
}

/// CONNECT, wait for CONNECTED, then SUBSCRIBE. The channel is not ready
/// until the broker has acknowledged the session.
async fn stomp_handshake(
    sink: &mut WsSink,
    stream: &mut WsStream,
    token: &str,
    destination: &str,
) -> Result<()> {
    sink.send(Message::Text(stomp::connect(token).encode()))
        .await
        .map_err(|e| TeamFlowError::connect(e.to_string()))?;
    loop {
        let Some(next) = stream.next().await else {
            return Err(TeamFlowError::connect("socket closed during handshake"));
        };
        match next.map_err(|e| TeamFlowError::connect(e.to_string()))? {
            Message::Text(text) => {
                let frame = stomp::Frame::parse(&text)
                    .map_err(|e| TeamFlowError::connect(e.to_string()))?;
                match frame.command.as_str() {
                    "CONNECTED" => break,
                    "ERROR" => {
                        return Err(TeamFlowError::connect(
                            frame
                                .header_value("message")
                                .unwrap_or("broker rejected the connection")
                                .to_string(),
                        ));
                    }
                    other => debug!("ignoring {other} frame during handshake"),
                }
            }
            Message::Close(_) => {
                return Err(TeamFlowError::connect("socket closed during handshake"));
            }
            _ => {}
        }
    }
    sink.send(Message::Text(stomp::subscribe(destination).encode()))
        .await
        .map_err(|e| TeamFlowError::connect(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(transport: ChatTransport) -> WebSocketConnector {
        WebSocketConnector::new(&ClientConfig {
            chat_transport: transport,
            ..ClientConfig::default()
        })
    }

    #[test]
    fn raw_target_is_a_per_context_path() {
        let id = Uuid::nil();
        let target = connector(ChatTransport::RawSocket).target(ContextType::UserStory, id);
        assert_eq!(
            target.url,
            format!("ws://localhost:51738/chat/user-story/{id}")
        );
        assert!(target.subscribe.is_none());
        assert!(matches!(target.format, WireFormat::Raw));
    }

    #[test]
    fn stomp_target_uses_app_and_topic_destinations() {
        let id = Uuid::nil();
        let target = connector(ChatTransport::SubscribePublish).target(ContextType::Task, id);
        assert_eq!(target.url, "ws://localhost:51738/chat");
        assert_eq!(
            target.subscribe.as_deref(),
            Some(format!("/topic/chat/task/{id}").as_str())
        );
        assert!(matches!(
            target.format,
            WireFormat::SubscribePublish { ref publish } if *publish == format!("/app/chat/task/{id}")
        ));
    }
}
