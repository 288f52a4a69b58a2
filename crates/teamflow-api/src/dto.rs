//! Wire DTOs for the TeamFlow REST API.
//!
//! Every endpoint deserializes into a declared schema here; nothing pulls
//! fields out of raw response bodies by hand.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use teamflow_core::chat::ChatMessage;
use teamflow_core::entity::Entity;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    pub id: Uuid,
    pub name: String,
}

impl From<TeamDto> for Entity {
    fn from(dto: TeamDto) -> Self {
        Entity::Team {
            id: dto.id,
            name: dto.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintDto {
    pub id: Uuid,
    pub name: String,
}

impl From<SprintDto> for Entity {
    fn from(dto: SprintDto) -> Self {
        Entity::Sprint {
            id: dto.id,
            name: dto.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicDto {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<EpicDto> for Entity {
    fn from(dto: EpicDto) -> Self {
        Entity::Epic {
            id: dto.id,
            name: dto.name,
            description: dto.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStoryDto {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<UserStoryDto> for Entity {
    fn from(dto: UserStoryDto) -> Self {
        Entity::UserStory {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            status: dto.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<TaskDto> for Entity {
    fn from(dto: TaskDto) -> Self {
        Entity::Task {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            status: dto.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender: Option<UserDto>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<MessageDto> for ChatMessage {
    fn from(dto: MessageDto) -> Self {
        ChatMessage {
            content: dto.content,
            sender_username: dto
                .sender
                .and_then(|s| s.username)
                .unwrap_or_else(|| "Unknown".to_string()),
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponseDto {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic error body some endpoints return (`{"message": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBodyDto {
    pub message: String,
}

// ----- request payloads -----

#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RenameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSprintRequest<'a> {
    pub team_id: Uuid,
    pub name: &'a str,
    pub start_date: String,
    pub end_date: String,
}
