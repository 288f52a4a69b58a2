use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::chat::{ChatChannel, ChatConnector, ChatMessage, OnMessage};
use crate::console::Console;
use crate::directory::{AuthAction, Directory};
use crate::entity::{ContextType, Entity, EntityKind};
use crate::error::{Result, TeamFlowError};
use crate::nav::Navigator;

// ----- scripted console -----

#[derive(Default)]
struct MockConsole {
    inputs: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    output: Mutex<Vec<String>>,
}

impl MockConsole {
    fn scripted(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            inputs: Mutex::new(lines.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        })
    }

    fn output_contains(&self, needle: &str) -> bool {
        self.output
            .lock()
            .unwrap()
            .iter()
            .any(|line| line.contains(needle))
    }

    fn count_output(&self, needle: &str) -> usize {
        self.output
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    fn count_prompts(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

#[async_trait]
impl Console for MockConsole {
    async fn read_line(&self, prompt: &str) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.inputs.lock().unwrap().pop_front())
    }

    async fn read_secret(&self, prompt: &str) -> Result<Option<String>> {
        self.read_line(prompt).await
    }

    fn info(&self, message: &str) {
        self.output.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.output
            .lock()
            .unwrap()
            .push(format!("ERROR: {message}"));
    }
}

// ----- in-memory directory -----

#[derive(Default)]
struct MockDirectory {
    teams: Mutex<Vec<Entity>>,
    team_list_errors: Mutex<VecDeque<TeamFlowError>>,
    lists: Mutex<HashMap<ContextType, std::result::Result<Vec<Entity>, TeamFlowError>>>,
    token: Mutex<Option<String>>,
    created: Mutex<Vec<(ContextType, String)>>,
    sprints_started: Mutex<Vec<(String, String, String)>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl MockDirectory {
    fn with_teams(teams: Vec<Entity>) -> Arc<Self> {
        let dir = Self::default();
        *dir.teams.lock().unwrap() = teams;
        Arc::new(dir)
    }

    fn set_list(&self, kind: ContextType, result: std::result::Result<Vec<Entity>, TeamFlowError>) {
        self.lists.lock().unwrap().insert(kind, result);
    }

    fn push_team_list_error(&self, err: TeamFlowError) {
        self.team_list_errors.lock().unwrap().push_back(err);
    }

    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

fn entity(kind: ContextType, name: &str) -> Entity {
    let id = Uuid::new_v4();
    let name = name.to_string();
    match kind {
        ContextType::Sprint => Entity::Sprint { id, name },
        ContextType::Epic => Entity::Epic {
            id,
            name,
            description: None,
        },
        ContextType::UserStory => Entity::UserStory {
            id,
            name,
            description: None,
            status: None,
        },
        ContextType::Task => Entity::Task {
            id,
            name,
            description: None,
            status: None,
        },
    }
}

fn team(name: &str) -> Entity {
    Entity::Team {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn login(&self, _action: AuthAction, _username: &str, _password: &str) -> Result<String> {
        *self.token.lock().unwrap() = Some("abc".to_string());
        Ok("abc".to_string())
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn list_teams(&self) -> Result<Vec<Entity>> {
        if let Some(err) = self.team_list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.teams.lock().unwrap().clone())
    }

    async fn create_team(&self, name: &str) -> Result<Entity> {
        let created = team(name);
        self.teams.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list(&self, kind: ContextType, _team_id: Uuid) -> Result<Vec<Entity>> {
        self.lists
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create(
        &self,
        kind: ContextType,
        _team_id: Uuid,
        name: &str,
        _description: Option<&str>,
        _status: Option<&str>,
    ) -> Result<Entity> {
        // Mirror the REST client: a missing parent aborts before any create
        // call happens.
        if let Some(Err(err)) = self.lists.lock().unwrap().get(&kind) {
            if err.is_no_parent() {
                return Err(err.clone());
            }
        }
        self.created.lock().unwrap().push((kind, name.to_string()));
        Ok(entity(kind, name))
    }

    async fn start_sprint(
        &self,
        _team_id: Uuid,
        name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Entity> {
        self.sprints_started.lock().unwrap().push((
            name.to_string(),
            start_date.to_string(),
            end_date.to_string(),
        ));
        Ok(entity(ContextType::Sprint, name))
    }

    async fn update(&self, kind: EntityKind, id: Uuid, name: &str) -> Result<Entity> {
        Ok(match kind {
            EntityKind::Team => Entity::Team {
                id,
                name: name.to_string(),
            },
            EntityKind::Context(ct) => entity(ct, name),
        })
    }

    async fn delete(&self, _kind: EntityKind, id: Uuid) -> Result<()> {
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }

    async fn history(&self, _kind: ContextType, _id: Uuid) -> Result<Vec<ChatMessage>> {
        Ok(Vec::new())
    }
}

// ----- recording chat connector -----

#[derive(Default)]
struct MockChannelState {
    sent: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

struct MockChannel(Arc<MockChannelState>);

#[async_trait]
impl ChatChannel for MockChannel {
    async fn send(&self, content: &str) -> Result<()> {
        if self.0.closes.load(Ordering::SeqCst) > 0 {
            return Err(TeamFlowError::NotConnected);
        }
        self.0.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockConnector {
    fail: bool,
    state: Arc<MockChannelState>,
    opens: AtomicUsize,
}

impl MockConnector {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl ChatConnector for MockConnector {
    async fn open(
        &self,
        _context_type: ContextType,
        _context_id: Uuid,
        _token: &str,
        _on_message: OnMessage,
    ) -> Result<Box<dyn ChatChannel>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TeamFlowError::connect("connection timed out"));
        }
        Ok(Box::new(MockChannel(Arc::clone(&self.state))))
    }
}

fn navigator(
    directory: &Arc<MockDirectory>,
    connector: &Arc<MockConnector>,
    console: &Arc<MockConsole>,
) -> Navigator<MockDirectory, MockConnector, MockConsole> {
    Navigator::new(
        Arc::clone(directory),
        Arc::clone(connector),
        Arc::clone(console),
    )
}

// ----- tests -----

#[tokio::test]
async fn login_team_select_and_empty_epic_list() {
    let directory = MockDirectory::with_teams(vec![team("alpha"), team("beta")]);
    directory.set_list(ContextType::Epic, Ok(Vec::new()));
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&["login", "ada", "secret", "2", "epic", "/back", "/exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert_eq!(directory.token().as_deref(), Some("abc"));
    assert!(console.output_contains("Login successful!"));
    assert!(console.output_contains("Team selected: beta"));
    assert!(console.output_contains("No epics available"));

    let beta_id = directory.teams.lock().unwrap()[1].id();
    assert_eq!(nav.session().team_id(), Some(beta_id));
    assert!(nav.session().context().is_none());
}

#[tokio::test]
async fn out_of_range_and_non_numeric_selection_reprompts() {
    let directory = MockDirectory::with_teams(vec![team("alpha"), team("beta")]);
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&["login", "ada", "secret", "0", "3", "abc", "/exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert_eq!(console.count_output("Invalid team number."), 2);
    assert!(console.output_contains("Invalid input. Please enter a number or a command."));
    assert!(nav.session().team_id().is_none());
}

#[tokio::test]
async fn back_from_entity_selection_returns_to_context_type() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(ContextType::Sprint, Ok(vec![entity(ContextType::Sprint, "s1")]));
    let connector = Arc::new(MockConnector::default());
    let console =
        MockConsole::scripted(&["login", "ada", "secret", "1", "sprint", "/back", "/exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    // The context-type prompt is shown twice: once on the way in, once after
    // backing out of entity selection.
    assert_eq!(console.count_prompts("Choose a context type"), 2);
    assert!(nav.session().context().is_none());
    assert!(nav.session().team_id().is_some());
}

#[tokio::test]
async fn auth_failure_on_listing_forces_relogin() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(
        ContextType::Epic,
        Err(TeamFlowError::auth("token expired")),
    );
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&["login", "ada", "secret", "1", "epic", "exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Please log in again."));
    assert_eq!(console.count_output("Welcome! Login or Register?"), 2);
    assert!(nav.session().token().is_none());
    assert!(directory.token().is_none());
}

#[tokio::test]
async fn team_list_fetch_failure_is_fatal_to_the_session() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.push_team_list_error(TeamFlowError::network("connection refused"));
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&["login", "ada", "secret", "exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Failed to fetch teams"));
    assert_eq!(console.count_output("Welcome! Login or Register?"), 2);
    assert!(nav.session().token().is_none());
}

#[tokio::test]
async fn chat_sends_messages_and_back_closes_channel() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(ContextType::Epic, Ok(vec![entity(ContextType::Epic, "e1")]));
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login", "ada", "secret", "1", "epic", "1", "hello there", "/back", "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Epic selected: e1"));
    assert_eq!(
        *connector.state.sent.lock().unwrap(),
        vec!["hello there".to_string()]
    );
    assert_eq!(connector.state.closes.load(Ordering::SeqCst), 1);
    assert!(nav.session().context().is_none());
}

#[tokio::test]
async fn connect_failure_returns_to_entity_selection() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(ContextType::Epic, Ok(vec![entity(ContextType::Epic, "e1")]));
    let connector = MockConnector::failing();
    let console =
        MockConsole::scripted(&["login", "ada", "secret", "1", "epic", "1", "/back", "/exit"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Failed to open chat"));
    // Entity selection prompt shown twice: before the pick and again after
    // the failed connect.
    assert_eq!(console.count_prompts("Select a epic number"), 2);
    assert!(nav.session().context().is_none());
}

#[tokio::test]
async fn missing_parent_blocks_user_story_create() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(
        ContextType::UserStory,
        Err(TeamFlowError::NoParent {
            child: ContextType::UserStory,
            parent: ContextType::Epic,
        }),
    );
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login",
        "ada",
        "secret",
        "1",
        "userstory",
        "/create userstory Onboarding",
        "/back",
        "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Cannot create User Story"));
    assert!(directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login",
        "ada",
        "secret",
        "/delete team 1",
        "no",
        "/delete team 1",
        "yes",
        "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Deletion cancelled."));
    assert_eq!(directory.deleted.lock().unwrap().len(), 1);
    assert!(console.output_contains("Team deleted successfully."));
}

#[tokio::test]
async fn sprint_creation_prompts_for_dates() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login",
        "ada",
        "secret",
        "1",
        "sprint",
        "/create sprint Iteration-7",
        "2025-03-01",
        "2025-03-14",
        "/back",
        "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert_eq!(
        *directory.sprints_started.lock().unwrap(),
        vec![(
            "Iteration-7".to_string(),
            "2025-03-01".to_string(),
            "2025-03-14".to_string(),
        )]
    );
    assert!(console.output_contains("Sprint created: Iteration-7"));
}

#[tokio::test]
async fn sprint_creation_rejects_malformed_dates() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login",
        "ada",
        "secret",
        "1",
        "sprint",
        "/create sprint Iteration-8",
        "03/01/2025",
        "2025-03-14",
        "/back",
        "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Invalid date format"));
    assert!(directory.sprints_started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_command_kind_is_rejected_in_place() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    directory.set_list(ContextType::Epic, Ok(Vec::new()));
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&[
        "login",
        "ada",
        "secret",
        "1",
        "epic",
        "/create task Mismatch",
        "/back",
        "/exit",
    ]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Invalid command type. Expected '/<action> epic ...'"));
    assert!(directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn end_of_input_behaves_like_exit() {
    let directory = MockDirectory::with_teams(vec![team("alpha")]);
    let connector = Arc::new(MockConnector::default());
    let console = MockConsole::scripted(&["login", "ada", "secret"]);

    let mut nav = navigator(&directory, &connector, &console);
    nav.run().await.unwrap();

    assert!(console.output_contains("Exiting application."));
}
