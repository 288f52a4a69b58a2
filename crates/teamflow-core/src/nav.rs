//! The navigation state machine.
//!
//! Drives login → team selection → context-type selection → entity selection
//! → chat, with `/back` backtracking and `/exit` from every prompt. CRUD
//! slash-commands run inline with listing and never auto-advance the state.
//!
//! Propagation policy: an `Auth` failure from any directory call forces a
//! return to [`NavState::LoggedOut`]; a team-list fetch failure does the
//! same (nothing can proceed without teams); every other failure is printed
//! and the current prompt is shown again.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::chat::{ChatChannel, ChatConnector};
use crate::command::{self, Command};
use crate::console::Console;
use crate::directory::{AuthAction, Directory};
use crate::entity::{ContextType, Entity, EntityKind};
use crate::error::Result;
use crate::session::Session;

/// Where the user currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    LoggedOut,
    TeamSelection,
    ContextTypeSelection,
    EntitySelection(ContextType),
    Chat(ContextType, Uuid),
    Exiting,
}

/// Owns the session store and walks the state machine until the user exits.
pub struct Navigator<D, C, IO> {
    session: Session,
    directory: Arc<D>,
    connector: Arc<C>,
    console: Arc<IO>,
}

impl<D, C, IO> Navigator<D, C, IO>
where
    D: Directory,
    C: ChatConnector,
    IO: Console + 'static,
{
    pub fn new(directory: Arc<D>, connector: Arc<C>, console: Arc<IO>) -> Self {
        Self {
            session: Session::new(),
            directory,
            connector,
            console,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the machine to completion. Returns when the user exits or input
    /// ends.
    pub async fn run(&mut self) -> Result<()> {
        let mut state = NavState::LoggedOut;
        loop {
            debug!(?state, "navigation step");
            state = match state {
                NavState::LoggedOut => self.logged_out().await?,
                NavState::TeamSelection => self.team_selection().await?,
                NavState::ContextTypeSelection => self.context_type_selection().await?,
                NavState::EntitySelection(ct) => self.entity_selection(ct).await?,
                NavState::Chat(ct, id) => self.chat(ct, id).await?,
                NavState::Exiting => {
                    self.console.info("Exiting application.");
                    return Ok(());
                }
            };
        }
    }

    // ----- LoggedOut -----

    async fn logged_out(&mut self) -> Result<NavState> {
        loop {
            self.console
                .info("\nWelcome! Login or Register? (login/register/exit)");
            let Some(choice) = self.console.read_line("> ").await? else {
                return Ok(NavState::Exiting);
            };
            let choice = choice.trim().to_lowercase();

            let action = match choice.as_str() {
                "exit" | "/exit" => return Ok(NavState::Exiting),
                "login" => AuthAction::Login,
                "register" => AuthAction::Register,
                _ => {
                    self.console
                        .info("Invalid choice. Please enter 'login', 'register', or 'exit'.");
                    continue;
                }
            };

            let Some(username) = self.console.read_line("Username: ").await? else {
                return Ok(NavState::Exiting);
            };
            let Some(password) = self.console.read_secret("Password: ").await? else {
                return Ok(NavState::Exiting);
            };

            match self
                .directory
                .login(action, username.trim(), &password)
                .await
            {
                Ok(token) if !token.is_empty() => {
                    self.session.set_token(token);
                    self.console
                        .info(&format!("{} successful!", action.label()));
                    return Ok(NavState::TeamSelection);
                }
                Ok(_) => {
                    self.console
                        .error("Authentication failed: no token received.");
                }
                Err(e) => {
                    self.console.error(&format!("Authentication failed: {e}"));
                    self.console.info("Try again or choose another option.");
                }
            }
        }
    }

    // ----- TeamSelection -----

    async fn team_selection(&mut self) -> Result<NavState> {
        loop {
            self.console.info("\nAvailable teams:");
            let teams = match self.directory.list_teams().await {
                Ok(teams) => teams,
                Err(e) => {
                    // A team list is the root of everything else; treat a
                    // fetch failure here like an expired session.
                    self.console.error(&format!("Failed to fetch teams: {e}"));
                    self.console
                        .info("Cannot proceed without teams. Please log in again.");
                    return Ok(self.force_logout());
                }
            };

            if teams.is_empty() {
                self.console.info(
                    "No teams available. Use '/create team <name>' or '/create team \"<name with spaces>\"' to create one.",
                );
            } else {
                self.print_listing(&teams);
            }

            let Some(input) = self
                .console
                .read_line(
                    "Select a team number or command (/create team..., /edit team..., /delete team..., /exit): ",
                )
                .await?
            else {
                return Ok(NavState::Exiting);
            };
            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                match command::parse(input) {
                    Ok(Command::Exit) => return Ok(NavState::Exiting),
                    Ok(Command::Back) => {
                        self.console.info("Already at team selection.");
                    }
                    Ok(cmd) => {
                        if let Some(next) = self.run_team_command(cmd, &teams).await? {
                            return Ok(next);
                        }
                        // Re-list and re-prompt regardless of outcome.
                    }
                    Err(e) => self.console.info(&e.to_string()),
                }
                continue;
            }

            if let Some(team) = self.pick(&teams, input, "team") {
                let (id, name) = (team.id(), team.name().to_string());
                self.session.select_team(id);
                self.console.info(&format!("Team selected: {name}"));
                return Ok(NavState::ContextTypeSelection);
            }
        }
    }

    /// Executes a CRUD command at the team prompt. Returns `Some(state)` only
    /// when the failure forces a state change (auth), `None` to re-list.
    async fn run_team_command(
        &mut self,
        cmd: Command,
        teams: &[Entity],
    ) -> Result<Option<NavState>> {
        let kind = match &cmd {
            Command::Create { kind, .. }
            | Command::Edit { kind, .. }
            | Command::Delete { kind, .. } => *kind,
            Command::Back | Command::Exit => return Ok(None),
        };
        if kind != EntityKind::Team {
            self.console
                .info("Invalid command type at team selection. Expected '/<action> team ...'");
            return Ok(None);
        }

        let outcome = match cmd {
            Command::Create { name, .. } => self
                .directory
                .create_team(&name)
                .await
                .map(|team| format!("Team created: {}", team.name())),
            Command::Edit { index, name, .. } => {
                let Some(id) = self.id_at_index(teams, index) else {
                    return Ok(None);
                };
                self.directory
                    .update(EntityKind::Team, id, &name)
                    .await
                    .map(|team| format!("Team updated to: {}", team.name()))
            }
            Command::Delete { index, .. } => {
                let Some(id) = self.id_at_index(teams, index) else {
                    return Ok(None);
                };
                if !self.confirm_delete("team").await? {
                    return Ok(None);
                }
                self.directory
                    .delete(EntityKind::Team, id)
                    .await
                    .map(|_| "Team deleted successfully.".to_string())
            }
            Command::Back | Command::Exit => return Ok(None),
        };

        match outcome {
            Ok(message) => {
                self.console.info(&message);
                Ok(None)
            }
            Err(e) => Ok(self.report_directory_error(e)),
        }
    }

    // ----- ContextTypeSelection -----

    async fn context_type_selection(&mut self) -> Result<NavState> {
        loop {
            let Some(input) = self
                .console
                .read_line("\nChoose a context type (sprint/epic/userstory/task) or /back, /exit: ")
                .await?
            else {
                return Ok(NavState::Exiting);
            };
            let input = input.trim().to_lowercase();

            match input.as_str() {
                "/exit" => return Ok(NavState::Exiting),
                "/back" => {
                    self.session.clear_team();
                    return Ok(NavState::TeamSelection);
                }
                "" => continue,
                other => match other.parse::<ContextType>() {
                    Ok(ct) => return Ok(NavState::EntitySelection(ct)),
                    Err(_) => self.console.info("Invalid context type."),
                },
            }
        }
    }

    // ----- EntitySelection -----

    async fn entity_selection(&mut self, ct: ContextType) -> Result<NavState> {
        let Some(team_id) = self.session.team_id() else {
            return Ok(NavState::TeamSelection);
        };

        loop {
            self.console
                .info(&format!("\nAvailable {}:", ct.plural_label()));
            let entities = match self.directory.list(ct, team_id).await {
                Ok(entities) => entities,
                Err(e) if e.is_no_parent() => {
                    self.console.error(&e.to_string());
                    Vec::new()
                }
                Err(e) => {
                    if let Some(next) = self.report_directory_error(e) {
                        return Ok(next);
                    }
                    // Stay at this prompt with an empty listing so the user
                    // can retry, back out, or exit.
                    Vec::new()
                }
            };

            if entities.is_empty() {
                self.console.info(&format!(
                    "No {} available. Use '/create {} <name> [:: description]' to create one.",
                    ct.plural_label(),
                    ct.keyword(),
                ));
            } else {
                self.print_listing(&entities);
            }

            let Some(input) = self
                .console
                .read_line(&format!(
                    "Select a {} number or command (/create..., /edit..., /delete..., /back, /exit): ",
                    ct.keyword(),
                ))
                .await?
            else {
                return Ok(NavState::Exiting);
            };
            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                match command::parse(input) {
                    Ok(Command::Exit) => return Ok(NavState::Exiting),
                    Ok(Command::Back) => {
                        self.session.clear_context();
                        return Ok(NavState::ContextTypeSelection);
                    }
                    Ok(cmd) => {
                        if let Some(next) = self.run_entity_command(ct, team_id, cmd, &entities).await?
                        {
                            return Ok(next);
                        }
                    }
                    Err(e) => self.console.info(&e.to_string()),
                }
                continue;
            }

            if let Some(entity) = self.pick(&entities, input, ct.keyword()) {
                let (id, name) = (entity.id(), entity.name().to_string());
                self.session.select_context(ct, id);
                self.console
                    .info(&format!("{} selected: {name}", ct.label()));
                return Ok(NavState::Chat(ct, id));
            }
        }
    }

    async fn run_entity_command(
        &mut self,
        ct: ContextType,
        team_id: Uuid,
        cmd: Command,
        entities: &[Entity],
    ) -> Result<Option<NavState>> {
        let kind = match &cmd {
            Command::Create { kind, .. }
            | Command::Edit { kind, .. }
            | Command::Delete { kind, .. } => *kind,
            Command::Back | Command::Exit => return Ok(None),
        };
        if kind != EntityKind::Context(ct) {
            self.console.info(&format!(
                "Invalid command type. Expected '/<action> {} ...'",
                ct.keyword(),
            ));
            return Ok(None);
        }

        let outcome = match cmd {
            Command::Create {
                name, description, ..
            } => {
                return self
                    .create_entity(ct, team_id, &name, description.as_deref())
                    .await;
            }
            Command::Edit { index, name, .. } => {
                let Some(id) = self.id_at_index(entities, index) else {
                    return Ok(None);
                };
                self.directory
                    .update(EntityKind::Context(ct), id, &name)
                    .await
                    .map(|entity| format!("{} updated to: {}", ct.label(), entity.name()))
            }
            Command::Delete { index, .. } => {
                let Some(id) = self.id_at_index(entities, index) else {
                    return Ok(None);
                };
                if !self.confirm_delete(ct.keyword()).await? {
                    return Ok(None);
                }
                self.directory
                    .delete(EntityKind::Context(ct), id)
                    .await
                    .map(|_| format!("{} deleted successfully.", ct.label()))
            }
            Command::Back | Command::Exit => return Ok(None),
        };

        match outcome {
            Ok(message) => {
                self.console.info(&message);
                Ok(None)
            }
            Err(e) => Ok(self.report_directory_error(e)),
        }
    }

    async fn create_entity(
        &mut self,
        ct: ContextType,
        team_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<NavState>> {
        let outcome = if ct == ContextType::Sprint {
            // Starting a sprint needs a date range; prompt for it instead of
            // growing the command grammar.
            let Some((start, end)) = self.prompt_sprint_dates().await? else {
                return Ok(None);
            };
            self.directory
                .start_sprint(team_id, name, &start, &end)
                .await
                .map(|sprint| format!("Sprint created: {}", sprint.name()))
        } else {
            self.directory
                .create(ct, team_id, name, description, None)
                .await
                .map(|entity| format!("{} created successfully: {}", ct.label(), entity.name()))
        };

        match outcome {
            Ok(message) => {
                self.console.info(&message);
                Ok(None)
            }
            Err(e) if e.is_no_parent() => {
                self.console
                    .error(&format!("Cannot create {}: {e}", ct.label()));
                Ok(None)
            }
            Err(e) => Ok(self.report_directory_error(e)),
        }
    }

    /// Prompts for the sprint date range. Returns `None` when the input is
    /// invalid or ends; dates come back validated as `YYYY-MM-DD`.
    async fn prompt_sprint_dates(&mut self) -> Result<Option<(String, String)>> {
        let Some(start) = self
            .console
            .read_line("Enter start date (YYYY-MM-DD): ")
            .await?
        else {
            return Ok(None);
        };
        let Some(end) = self
            .console
            .read_line("Enter end date (YYYY-MM-DD): ")
            .await?
        else {
            return Ok(None);
        };
        let start = start.trim().to_string();
        let end = end.trim().to_string();
        let valid = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();
        if !valid(&start) || !valid(&end) {
            self.console
                .error("Invalid date format. Please use YYYY-MM-DD.");
            return Ok(None);
        }
        Ok(Some((start, end)))
    }

    // ----- Chat -----

    async fn chat(&mut self, ct: ContextType, context_id: Uuid) -> Result<NavState> {
        let Some(token) = self.session.token().map(str::to_string) else {
            return Ok(self.force_logout());
        };

        self.console.info(&format!(
            "\n--- Entering {} chat ({context_id}) ---",
            ct.keyword(),
        ));

        match self.directory.history(ct, context_id).await {
            Ok(messages) if !messages.is_empty() => {
                self.console.info("Recent messages:");
                for msg in &messages {
                    self.console.info(&format!("[{}]", msg.display_line()));
                }
            }
            Ok(_) => {}
            Err(e) => {
                // History is a nicety; the live channel is the point.
                self.console
                    .error(&format!("Failed to fetch recent messages: {e}"));
            }
        }

        let display = Arc::clone(&self.console);
        let on_message: crate::chat::OnMessage = Arc::new(move |msg| {
            display.chat_message(&format!("\n{}", msg.display_line()));
        });

        let channel: Box<dyn ChatChannel> = match self
            .connector
            .open(ct, context_id, &token, on_message)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                self.console.error(&format!("Failed to open chat: {e}"));
                self.session.clear_context();
                return Ok(NavState::EntitySelection(ct));
            }
        };

        self.console
            .info("Enter messages to send, or /back to return to context selection, /exit to quit:");

        loop {
            let Some(input) = self.console.read_line("> ").await? else {
                channel.close().await;
                return Ok(NavState::Exiting);
            };
            match input.trim() {
                "/back" => {
                    channel.close().await;
                    self.session.clear_context();
                    self.console.info("--- Exiting chat ---");
                    return Ok(NavState::ContextTypeSelection);
                }
                "/exit" => {
                    channel.close().await;
                    return Ok(NavState::Exiting);
                }
                "" => continue,
                text => {
                    if let Err(e) = channel.send(text).await {
                        self.console.error(&format!("Message not sent: {e}"));
                    }
                }
            }
        }
    }

    // ----- shared helpers -----

    /// Clears auth state in both the session and the directory client.
    fn force_logout(&mut self) -> NavState {
        self.session.clear_token();
        self.directory.set_token(None);
        NavState::LoggedOut
    }

    /// Prints a directory failure. Auth failures flip the machine back to
    /// the login prompt; everything else just gets reported.
    fn report_directory_error(&mut self, e: crate::error::TeamFlowError) -> Option<NavState> {
        if e.is_auth() {
            self.console
                .error(&format!("{e}. Please log in again."));
            return Some(self.force_logout());
        }
        self.console.error(&e.to_string());
        None
    }

    fn print_listing(&self, entities: &[Entity]) {
        for (i, entity) in entities.iter().enumerate() {
            self.console.info(&format!(
                "{}. {}: {}",
                i + 1,
                entity.kind().label(),
                entity.name(),
            ));
        }
    }

    /// Resolves a typed 1-based selection against the current listing,
    /// reporting the appropriate message on failure.
    fn pick<'a>(&self, entities: &'a [Entity], input: &str, label: &str) -> Option<&'a Entity> {
        let Ok(number) = input.parse::<usize>() else {
            self.console
                .info("Invalid input. Please enter a number or a command.");
            return None;
        };
        if number == 0 || number > entities.len() {
            self.console.info(&format!("Invalid {label} number."));
            return None;
        }
        Some(&entities[number - 1])
    }

    /// Same bounds check for command-supplied indices (`/edit`, `/delete`).
    fn id_at_index(&self, entities: &[Entity], index: usize) -> Option<Uuid> {
        if index == 0 || index > entities.len() {
            self.console.info(&format!("Invalid index: {index}"));
            return None;
        }
        Some(entities[index - 1].id())
    }

    async fn confirm_delete(&mut self, label: &str) -> Result<bool> {
        let Some(answer) = self
            .console
            .read_line(&format!(
                "Are you sure you want to delete this {label}? (yes/no): ",
            ))
            .await?
        else {
            return Ok(false);
        };
        if answer.trim().eq_ignore_ascii_case("yes") {
            Ok(true)
        } else {
            self.console.info("Deletion cancelled.");
            Ok(false)
        }
    }
}

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;
