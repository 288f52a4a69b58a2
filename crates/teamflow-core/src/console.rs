//! Terminal input/output seam for the navigation machine.
//!
//! The binary implements this over rustyline; tests drive the machine with a
//! scripted implementation.

use async_trait::async_trait;

use crate::error::Result;

/// Blocking-style line IO as seen from the navigation loop.
#[async_trait]
pub trait Console: Send + Sync {
    /// Reads one line. `Ok(None)` means end of input (ctrl-D), which the
    /// navigation machine treats like `/exit`.
    async fn read_line(&self, prompt: &str) -> Result<Option<String>>;

    /// Reads a secret (password). Implementations may fall back to a plain
    /// read when the terminal cannot suppress echo.
    async fn read_secret(&self, prompt: &str) -> Result<Option<String>>;

    /// Normal informational output.
    fn info(&self, message: &str);

    /// Inbound chat transcript output. Defaults to plain info; terminal
    /// implementations may restyle it.
    fn chat_message(&self, message: &str) {
        self.info(message);
    }

    /// Error output, visually distinct from info.
    fn error(&self, message: &str);
}
