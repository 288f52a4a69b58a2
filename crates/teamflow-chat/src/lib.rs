//! Websocket chat transport for the TeamFlow client.
//!
//! Two wire formats sit behind one connector: a raw per-context socket
//! speaking bare JSON, and a STOMP-style subscribe/publish endpoint. The
//! choice is configuration; callers only see the channel traits from
//! `teamflow-core`.

pub mod channel;
pub mod connector;
pub mod stomp;
pub mod wire;

pub use channel::SocketChannel;
pub use connector::WebSocketConnector;
