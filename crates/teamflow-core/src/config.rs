//! Client configuration.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which wire format the realtime chat channel speaks.
///
/// The server exposes both; the client picks one by configuration instead of
/// maintaining two parallel chat clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChatTransport {
    /// Raw socket at `/chat/{kind}/{id}` exchanging bare JSON objects.
    #[default]
    RawSocket,
    /// STOMP-style subscribe/publish frames over `/app/...` and `/topic/...`
    /// destinations.
    SubscribePublish,
}

/// How the parent entity is chosen when listing or creating a user story or
/// task.
///
/// The server nests these kinds (user story under epic, task under user
/// story) but the client tracks only one current parent. `FirstListed`
/// reproduces the long-standing behavior of targeting whatever the server
/// returns first; the strategy is explicit here so a chooser can be added
/// without touching call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParentStrategy {
    #[default]
    FirstListed,
}

/// Configuration for the REST and chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, including the `/api` prefix.
    pub api_base_url: String,
    /// Base URL of the chat websocket endpoint.
    pub ws_base_url: String,
    /// Wire format for the realtime channel.
    pub chat_transport: ChatTransport,
    /// Parent choice for nested creates.
    pub parent_strategy: ParentStrategy,
    /// Seconds to wait for chat channel readiness before giving up.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:51738/api".to_string(),
            ws_base_url: "ws://localhost:51738/chat".to_string(),
            chat_transport: ChatTransport::default(),
            parent_strategy: ParentStrategy::default(),
            connect_timeout_secs: 15,
        }
    }
}

impl ClientConfig {
    /// Builds a config from environment variables, falling back to the
    /// compiled-in defaults for anything unset.
    ///
    /// Recognized variables: `TEAMFLOW_API_URL`, `TEAMFLOW_WS_URL`,
    /// `TEAMFLOW_CHAT_TRANSPORT` (`raw-socket` | `subscribe-publish`),
    /// `TEAMFLOW_CONNECT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("TEAMFLOW_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = env::var("TEAMFLOW_WS_URL") {
            config.ws_base_url = url;
        }
        if let Ok(transport) = env::var("TEAMFLOW_CHAT_TRANSPORT") {
            match transport.as_str() {
                "raw-socket" => config.chat_transport = ChatTransport::RawSocket,
                "subscribe-publish" => config.chat_transport = ChatTransport::SubscribePublish,
                other => {
                    tracing::warn!("Unknown TEAMFLOW_CHAT_TRANSPORT '{other}', using default")
                }
            }
        }
        if let Ok(secs) = env::var("TEAMFLOW_CONNECT_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.connect_timeout_secs = secs,
                _ => tracing::warn!("Invalid TEAMFLOW_CONNECT_TIMEOUT_SECS '{secs}', using default"),
            }
        }
        config
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
