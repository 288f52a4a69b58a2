//! REST implementation of the entity directory.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use teamflow_core::chat::ChatMessage;
use teamflow_core::config::{ClientConfig, ParentStrategy};
use teamflow_core::directory::{AuthAction, Directory};
use teamflow_core::entity::{
    ContextType, Entity, EntityKind, TASK_DEFAULT_STATUS, USER_STORY_DEFAULT_STATUS,
};
use teamflow_core::error::{Result, TeamFlowError};

use crate::dto::{
    AuthRequest, CreateEntityRequest, EpicDto, ErrorBodyDto, LoginResponseDto, MessageDto,
    RenameRequest, SprintDto, StartSprintRequest, TaskDto, TeamDto, UserStoryDto,
};

/// Directory client over the TeamFlow REST API.
///
/// Holds the bearer token behind a lock; the navigation loop is the single
/// writer (after login and on forced logout).
pub struct RestDirectory {
    http: Client,
    base_url: String,
    parent_strategy: ParentStrategy,
    token: RwLock<Option<String>>,
}

impl RestDirectory {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            parent_strategy: config.parent_strategy,
            token: RwLock::new(None),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Ok(token) = self.token.read() {
            if let Some(token) = token.as_deref() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }
        builder
    }

    /// Sends the request, mapping transport failures and non-success
    /// statuses onto the error taxonomy.
    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| TeamFlowError::network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.execute(self.request(Method::GET, path)).await?;
        response
            .json()
            .await
            .map_err(|e| TeamFlowError::Decode(e.to_string()))
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(%method, path, "request with body");
        let response = self
            .execute(self.request(method, path).json(body))
            .await?;
        response
            .json()
            .await
            .map_err(|e| TeamFlowError::Decode(e.to_string()))
    }

    // ----- parent resolution -----

    async fn first_epic_id(&self, team_id: Uuid) -> Result<Option<Uuid>> {
        let epics: Vec<EpicDto> = self.get(&format!("/epics?teamId={team_id}")).await?;
        Ok(epics.first().map(|e| e.id))
    }

    async fn first_user_story_id(&self, team_id: Uuid) -> Result<Option<Uuid>> {
        let Some(epic_id) = self.first_epic_id(team_id).await? else {
            return Ok(None);
        };
        let stories: Vec<UserStoryDto> =
            self.get(&format!("/user-stories?epicId={epic_id}")).await?;
        Ok(stories.first().map(|s| s.id))
    }

    /// Resolves the parent id a nested kind lists/creates under, per the
    /// configured strategy. A missing parent is `NoParent`, not a fetch
    /// error, and no child call is issued after it.
    async fn resolve_parent(&self, kind: ContextType, team_id: Uuid) -> Result<Uuid> {
        // Only one strategy exists today; matching keeps the choice visible
        // when more are added.
        match self.parent_strategy {
            ParentStrategy::FirstListed => {}
        }
        match kind {
            ContextType::UserStory => {
                self.first_epic_id(team_id)
                    .await?
                    .ok_or(TeamFlowError::NoParent {
                        child: ContextType::UserStory,
                        parent: ContextType::Epic,
                    })
            }
            ContextType::Task => {
                self.first_user_story_id(team_id)
                    .await?
                    .ok_or(TeamFlowError::NoParent {
                        child: ContextType::Task,
                        parent: ContextType::UserStory,
                    })
            }
            other => Err(TeamFlowError::internal(format!(
                "{other} has no parent to resolve",
            ))),
        }
    }
}

#[async_trait]
impl Directory for RestDirectory {
    async fn login(&self, action: AuthAction, username: &str, password: &str) -> Result<String> {
        let response: LoginResponseDto = self
            .send_json(
                Method::POST,
                &format!("/{}", action.path()),
                &AuthRequest { username, password },
            )
            .await?;
        let token = response.token.unwrap_or_default();
        if token.is_empty() {
            return Err(TeamFlowError::auth(
                response
                    .message
                    .unwrap_or_else(|| "no token received".to_string()),
            ));
        }
        self.set_token(Some(token.clone()));
        Ok(token)
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    async fn list_teams(&self) -> Result<Vec<Entity>> {
        let teams: Vec<TeamDto> = self.get("/teams").await?;
        Ok(teams.into_iter().map(Entity::from).collect())
    }

    async fn create_team(&self, name: &str) -> Result<Entity> {
        let team: TeamDto = self
            .send_json(
                Method::POST,
                "/teams",
                &CreateEntityRequest {
                    name,
                    description: None,
                    status: None,
                },
            )
            .await?;
        Ok(team.into())
    }

    async fn list(&self, kind: ContextType, team_id: Uuid) -> Result<Vec<Entity>> {
        let entities = match kind {
            ContextType::Sprint => {
                let dtos: Vec<SprintDto> = self
                    .get(&format!("/sprints/teams/{team_id}/sprints"))
                    .await?;
                dtos.into_iter().map(Entity::from).collect()
            }
            ContextType::Epic => {
                let dtos: Vec<EpicDto> = self.get(&format!("/epics?teamId={team_id}")).await?;
                dtos.into_iter().map(Entity::from).collect()
            }
            ContextType::UserStory => {
                let epic_id = self.resolve_parent(kind, team_id).await?;
                let dtos: Vec<UserStoryDto> =
                    self.get(&format!("/user-stories?epicId={epic_id}")).await?;
                dtos.into_iter().map(Entity::from).collect()
            }
            ContextType::Task => {
                let story_id = self.resolve_parent(kind, team_id).await?;
                let dtos: Vec<TaskDto> =
                    self.get(&format!("/tasks?userStoryId={story_id}")).await?;
                dtos.into_iter().map(Entity::from).collect()
            }
        };
        Ok(entities)
    }

    async fn create(
        &self,
        kind: ContextType,
        team_id: Uuid,
        name: &str,
        description: Option<&str>,
        status: Option<&str>,
    ) -> Result<Entity> {
        let status = effective_status(kind, status);
        match kind {
            ContextType::Sprint => Err(TeamFlowError::internal(
                "starting a sprint is a distinct operation; use start_sprint",
            )),
            ContextType::Epic => {
                let dto: EpicDto = self
                    .send_json(
                        Method::POST,
                        &format!("/epics?teamId={team_id}"),
                        &CreateEntityRequest {
                            name,
                            description,
                            status: None,
                        },
                    )
                    .await?;
                Ok(dto.into())
            }
            ContextType::UserStory => {
                let epic_id = self.resolve_parent(kind, team_id).await?;
                let dto: UserStoryDto = self
                    .send_json(
                        Method::POST,
                        &format!("/user-stories?epicId={epic_id}"),
                        &CreateEntityRequest {
                            name,
                            description,
                            status,
                        },
                    )
                    .await?;
                Ok(dto.into())
            }
            ContextType::Task => {
                let story_id = self.resolve_parent(kind, team_id).await?;
                let dto: TaskDto = self
                    .send_json(
                        Method::POST,
                        &format!("/tasks?userStoryId={story_id}"),
                        &CreateEntityRequest {
                            name,
                            description,
                            status,
                        },
                    )
                    .await?;
                Ok(dto.into())
            }
        }
    }

    async fn start_sprint(
        &self,
        team_id: Uuid,
        name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Entity> {
        let (start, end) = sprint_bounds(start_date, end_date);
        let dto: SprintDto = self
            .send_json(
                Method::POST,
                "/sprints/start",
                &StartSprintRequest {
                    team_id,
                    name,
                    start_date: start,
                    end_date: end,
                },
            )
            .await?;
        Ok(dto.into())
    }

    async fn update(&self, kind: EntityKind, id: Uuid, name: &str) -> Result<Entity> {
        let path = format!("/{}/{id}", kind.plural_path());
        let body = RenameRequest { name };
        let entity = match kind {
            EntityKind::Team => self
                .send_json::<_, TeamDto>(Method::PUT, &path, &body)
                .await?
                .into(),
            EntityKind::Context(ContextType::Sprint) => self
                .send_json::<_, SprintDto>(Method::PUT, &path, &body)
                .await?
                .into(),
            EntityKind::Context(ContextType::Epic) => self
                .send_json::<_, EpicDto>(Method::PUT, &path, &body)
                .await?
                .into(),
            EntityKind::Context(ContextType::UserStory) => self
                .send_json::<_, UserStoryDto>(Method::PUT, &path, &body)
                .await?
                .into(),
            EntityKind::Context(ContextType::Task) => self
                .send_json::<_, TaskDto>(Method::PUT, &path, &body)
                .await?
                .into(),
        };
        Ok(entity)
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<()> {
        let path = format!("/{}/{id}", kind.plural_path());
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn history(&self, kind: ContextType, id: Uuid) -> Result<Vec<ChatMessage>> {
        let path = format!("/{}/{id}/messages", kind.plural_path());
        let messages: Vec<MessageDto> = self.get(&path).await?;
        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }
}

/// Applies the per-kind default status when the caller supplies none.
///
/// User stories and tasks have always carried different default tokens; both
/// are preserved as-is.
fn effective_status(kind: ContextType, status: Option<&str>) -> Option<&str> {
    if status.is_some() {
        return status;
    }
    match kind {
        ContextType::UserStory => Some(USER_STORY_DEFAULT_STATUS),
        ContextType::Task => Some(TASK_DEFAULT_STATUS),
        ContextType::Sprint | ContextType::Epic => None,
    }
}

/// Expands `YYYY-MM-DD` range ends into the day bounds the server expects.
fn sprint_bounds(start_date: &str, end_date: &str) -> (String, String) {
    (
        format!("{start_date}T00:00:00"),
        format!("{end_date}T23:59:59"),
    )
}

/// Maps a non-success HTTP status onto the shared taxonomy, preferring the
/// server's `message` field over the raw body.
fn error_for_status(status: StatusCode, body: &str) -> TeamFlowError {
    let message = serde_json::from_str::<ErrorBodyDto>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    match status {
        StatusCode::UNAUTHORIZED => TeamFlowError::Auth(message),
        StatusCode::NOT_FOUND => TeamFlowError::NotFound(message),
        s if s.is_client_error() => TeamFlowError::Validation(message),
        _ => TeamFlowError::Server(message),
    }
}
