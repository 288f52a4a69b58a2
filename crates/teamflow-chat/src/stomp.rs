//! Minimal STOMP 1.2 framing for the subscribe/publish transport.
//!
//! Only the handful of commands the chat channel exchanges are modeled:
//! CONNECT/CONNECTED for the handshake, SUBSCRIBE, SEND, MESSAGE, ERROR and
//! DISCONNECT. Heartbeats are negotiated off.

use std::fmt;

use teamflow_core::error::{Result, TeamFlowError};

/// One STOMP frame: command line, header lines, blank line, body, NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// First header with the given name, if present.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses a frame off the wire. The terminating NUL is optional; some
    /// brokers strip it before relaying.
    pub fn parse(raw: &str) -> Result<Frame> {
        let raw = raw.trim_end_matches('\0');
        let (head, body) = raw
            .split_once("\n\n")
            .ok_or_else(|| TeamFlowError::Decode(format!("frame without header block: {raw}")))?;
        let mut lines = head.lines();
        let command = lines
            .next()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| TeamFlowError::Decode("frame without command".to_string()))?
            .trim()
            .to_string();
        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                TeamFlowError::Decode(format!("malformed header line: {line}"))
            })?;
            headers.push((name.to_string(), value.to_string()));
        }
        Ok(Frame {
            command,
            headers,
            body: body.to_string(),
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} headers)", self.command, self.headers.len())
    }
}

/// CONNECT frame carrying the bearer token. Heartbeats are disabled.
pub fn connect(token: &str) -> Frame {
    Frame::new("CONNECT")
        .header("accept-version", "1.2")
        .header("heart-beat", "0,0")
        .header("Authorization", &format!("Bearer {token}"))
}

/// SUBSCRIBE to the context's topic.
pub fn subscribe(destination: &str) -> Frame {
    Frame::new("SUBSCRIBE")
        .header("id", "sub-0")
        .header("destination", destination)
}

/// SEND a JSON body to the context's application destination.
pub fn send(destination: &str, body: &str) -> Frame {
    Frame::new("SEND")
        .header("destination", destination)
        .header("content-type", "application/json")
        .body(body)
}

pub fn disconnect() -> Frame {
    Frame::new("DISCONNECT")
}
