use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use teamflow_api::RestDirectory;
use teamflow_chat::WebSocketConnector;
use teamflow_core::TeamFlowError;
use teamflow_core::config::ClientConfig;
use teamflow_core::console::Console;
use teamflow_core::nav::Navigator;

/// CLI helper for rustyline that provides completion, highlighting, and hints
/// for the slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/create".to_string(),
                "/edit".to_string(),
                "/delete".to_string(),
                "/back".to_string(),
                "/exit".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Rustyline-backed console for the navigation machine.
///
/// The editor is blocking, so reads run under `block_in_place` to keep the
/// runtime's worker threads free while the user types.
struct RustylineConsole {
    editor: Mutex<Editor<CliHelper, DefaultHistory>>,
}

impl RustylineConsole {
    fn new() -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CliHelper::new()));
        Ok(Self {
            editor: Mutex::new(editor),
        })
    }

    fn read(&self, prompt: &str) -> teamflow_core::Result<Option<String>> {
        tokio::task::block_in_place(|| {
            let mut editor = self
                .editor
                .lock()
                .map_err(|_| TeamFlowError::internal("console editor lock poisoned"))?;
            match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "CTRL-C detected. Type '/exit' to quit.".yellow());
                    Ok(Some(String::new()))
                }
                Err(ReadlineError::Eof) => Ok(None),
                Err(e) => Err(TeamFlowError::internal(format!("readline failed: {e}"))),
            }
        })
    }
}

#[async_trait]
impl Console for RustylineConsole {
    async fn read_line(&self, prompt: &str) -> teamflow_core::Result<Option<String>> {
        self.read(prompt)
    }

    async fn read_secret(&self, prompt: &str) -> teamflow_core::Result<Option<String>> {
        // Plain read; the line editor cannot suppress echo.
        self.read(prompt)
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn chat_message(&self, message: &str) {
        println!("{}", message.bright_blue());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message.red());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();

    let directory = Arc::new(RestDirectory::new(&config));
    let connector = Arc::new(WebSocketConnector::new(&config));
    let console = Arc::new(RustylineConsole::new()?);

    println!("{}", "=== TeamFlow Client ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Connected to {}", config.api_base_url).bright_black()
    );
    println!(
        "{}",
        "Navigate with numbers, manage with /create, /edit, /delete; /back and /exit work everywhere."
            .bright_black()
    );

    let mut navigator = Navigator::new(directory, connector, console);
    navigator.run().await?;

    Ok(())
}
