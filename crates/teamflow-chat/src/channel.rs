//! The open websocket channel and its background receive task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use teamflow_core::chat::{ChatChannel, ChatMessage, OnMessage};
use teamflow_core::error::{Result, TeamFlowError};

use crate::{stomp, wire};

pub(crate) type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub(crate) type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// How chat payloads are framed on the socket.
#[derive(Debug, Clone)]
pub(crate) enum WireFormat {
    /// Bare JSON objects on a per-context socket.
    Raw,
    /// STOMP frames on a shared endpoint; messages are published to the
    /// context's application destination.
    SubscribePublish { publish: String },
}

impl WireFormat {
    fn encode(&self, content: &str) -> String {
        let body = wire::encode_outbound(content);
        match self {
            WireFormat::Raw => body,
            WireFormat::SubscribePublish { publish } => stomp::send(publish, &body).encode(),
        }
    }

    /// Decodes one inbound text payload. `Ok(None)` means a frame that
    /// carries no chat message (broker acks and the like).
    fn decode(&self, text: &str) -> Result<Option<ChatMessage>> {
        match self {
            WireFormat::Raw => wire::decode_inbound(text).map(Some),
            WireFormat::SubscribePublish { .. } => {
                let frame = stomp::Frame::parse(text)?;
                match frame.command.as_str() {
                    "MESSAGE" => wire::decode_inbound(&frame.body).map(Some),
                    "ERROR" => {
                        warn!(
                            message = frame.header_value("message").unwrap_or("unknown"),
                            "broker reported an error frame"
                        );
                        Ok(None)
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    fn goodbye(&self) -> Option<String> {
        match self {
            WireFormat::Raw => None,
            WireFormat::SubscribePublish { .. } => Some(stomp::disconnect().encode()),
        }
    }
}

/// An open chat channel backed by one websocket and one background task.
///
/// The task owns both halves of the socket and runs until cancelled, the
/// peer closes, or the transport errors. Closing is idempotent; sending
/// after close is `NotConnected`.
pub struct SocketChannel {
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    closed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketChannel {
    pub(crate) fn spawn(
        sink: WsSink,
        stream: WsStream,
        format: WireFormat,
        on_message: OnMessage,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (outbound, rx) = mpsc::channel(16);
        let task = tokio::spawn(run_socket(
            sink,
            stream,
            rx,
            cancel.clone(),
            format,
            on_message,
        ));
        Self {
            outbound,
            cancel,
            closed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        }
    }

    #[cfg(test)]
    fn stub(outbound: mpsc::Sender<String>, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            outbound,
            cancel,
            closed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        }
    }
}

#[async_trait]
impl ChatChannel for SocketChannel {
    async fn send(&self, content: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TeamFlowError::NotConnected);
        }
        // The receive task dropping its end means the socket already died.
        self.outbound
            .send(content.to_string())
            .await
            .map_err(|_| TeamFlowError::NotConnected)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("chat socket task ended abnormally: {e}");
            }
        }
    }
}

async fn run_socket(
    mut sink: WsSink,
    mut stream: WsStream,
    mut outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
    format: WireFormat,
    on_message: OnMessage,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Some(goodbye) = format.goodbye() {
                    let _ = sink.send(Message::Text(goodbye)).await;
                }
                let _ = sink.send(Message::Close(None)).await;
                debug!("chat socket closed locally");
                break;
            }
            content = outbound.recv() => {
                let Some(content) = content else { break };
                if let Err(e) = sink.send(Message::Text(format.encode(&content))).await {
                    warn!("chat send failed: {e}");
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match format.decode(&text) {
                        Ok(Some(message)) => on_message(message),
                        Ok(None) => {}
                        // Undecodable frames are skipped, never fatal.
                        Err(e) => warn!("{e}"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("chat socket closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("chat socket error: {e}");
                        break;
                    }
                }
            }
        }
    }
}
