//! The entity directory seam.
//!
//! `teamflow-api` provides the REST implementation; navigation tests use an
//! in-memory mock. Every operation maps HTTP failures onto the shared error
//! taxonomy, so the navigation loop can treat `Auth` as "log in again" and
//! print everything else.

use async_trait::async_trait;
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::entity::{ContextType, Entity, EntityKind};
use crate::error::Result;

/// Whether an auth request is a login or a first-time registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    /// URL path segment (`/login` or `/register`).
    pub fn path(&self) -> &'static str {
        match self {
            AuthAction::Login => "login",
            AuthAction::Register => "register",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthAction::Login => "Login",
            AuthAction::Register => "Register",
        }
    }
}

/// Typed CRUD operations against the TeamFlow directory.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Authenticates and returns the bearer token. The implementation also
    /// remembers the token for subsequent calls.
    async fn login(&self, action: AuthAction, username: &str, password: &str) -> Result<String>;

    /// Replaces the remembered bearer token. The navigation loop is the only
    /// caller; it clears the token when forcing re-login.
    fn set_token(&self, token: Option<String>);

    async fn list_teams(&self) -> Result<Vec<Entity>>;

    async fn create_team(&self, name: &str) -> Result<Entity>;

    /// Lists entities of `kind` under the selected team. For user stories
    /// and tasks this resolves the parent per the configured strategy and
    /// fails with `NoParent` when none exists.
    async fn list(&self, kind: ContextType, team_id: Uuid) -> Result<Vec<Entity>>;

    /// Creates an entity of `kind`. Supplies the kind's default status when
    /// the caller passes none. Sprints are excluded: starting a sprint is a
    /// stateful team action with its own method below.
    async fn create(
        &self,
        kind: ContextType,
        team_id: Uuid,
        name: &str,
        description: Option<&str>,
        status: Option<&str>,
    ) -> Result<Entity>;

    /// Starts a sprint for the team. Distinct from [`Directory::create`]
    /// because the server models it as `POST /sprints/start`, not a plain
    /// resource creation. Dates are `YYYY-MM-DD`; the implementation expands
    /// them to the `T00:00:00` / `T23:59:59` bounds the server expects.
    async fn start_sprint(
        &self,
        team_id: Uuid,
        name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Entity>;

    /// Renames an entity.
    async fn update(&self, kind: EntityKind, id: Uuid, name: &str) -> Result<Entity>;

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<()>;

    /// One-shot fetch of recent messages for a context entity, replayed
    /// before the realtime channel opens.
    async fn history(&self, kind: ContextType, id: Uuid) -> Result<Vec<ChatMessage>>;
}
