//! Domain entities and the context-type vocabulary.
//!
//! Listings coming back from the server are decoded once into the [`Entity`]
//! tagged union, so call sites never downcast by context-type string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default status assigned to a user story created without an explicit status.
pub const USER_STORY_DEFAULT_STATUS: &str = "To Do";

/// Default status assigned to a task created without an explicit status.
///
/// Deliberately a different token than [`USER_STORY_DEFAULT_STATUS`]; the
/// server treats status as a free-form string and the two kinds have always
/// used different defaults.
pub const TASK_DEFAULT_STATUS: &str = "TODO";

/// The entity kind the user is currently browsing or chatting under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    Sprint,
    Epic,
    UserStory,
    Task,
}

impl ContextType {
    /// All context types, in menu order.
    pub const ALL: [ContextType; 4] = [
        ContextType::Sprint,
        ContextType::Epic,
        ContextType::UserStory,
        ContextType::Task,
    ];

    /// Lowercase keyword used at the context-type prompt and in commands.
    pub fn keyword(&self) -> &'static str {
        match self {
            ContextType::Sprint => "sprint",
            ContextType::Epic => "epic",
            ContextType::UserStory => "userstory",
            ContextType::Task => "task",
        }
    }

    /// Capitalized label for messages ("Sprint selected: ...").
    pub fn label(&self) -> &'static str {
        match self {
            ContextType::Sprint => "Sprint",
            ContextType::Epic => "Epic",
            ContextType::UserStory => "User Story",
            ContextType::Task => "Task",
        }
    }

    /// Plural form for prose ("no user stories available").
    pub fn plural_label(&self) -> &'static str {
        match self {
            ContextType::Sprint => "sprints",
            ContextType::Epic => "epics",
            ContextType::UserStory => "user stories",
            ContextType::Task => "tasks",
        }
    }

    /// Plural URL segment used by the REST and chat endpoints.
    pub fn plural_path(&self) -> &'static str {
        match self {
            ContextType::Sprint => "sprints",
            ContextType::Epic => "epics",
            ContextType::UserStory => "user-stories",
            ContextType::Task => "tasks",
        }
    }

    /// Path segment used by the chat endpoints (`/chat/{segment}/{id}`).
    pub fn chat_segment(&self) -> &'static str {
        match self {
            ContextType::Sprint => "sprint",
            ContextType::Epic => "epic",
            ContextType::UserStory => "user-story",
            ContextType::Task => "task",
        }
    }

    /// The parent kind required to list or create this kind, if any.
    pub fn parent(&self) -> Option<ContextType> {
        match self {
            ContextType::UserStory => Some(ContextType::Epic),
            ContextType::Task => Some(ContextType::UserStory),
            ContextType::Sprint | ContextType::Epic => None,
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ContextType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sprint" => Ok(ContextType::Sprint),
            "epic" => Ok(ContextType::Epic),
            "userstory" | "user-story" | "story" => Ok(ContextType::UserStory),
            "task" => Ok(ContextType::Task),
            _ => Err(()),
        }
    }
}

/// Any entity kind addressable by CRUD commands, teams included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Team,
    Context(ContextType),
}

impl EntityKind {
    /// Lowercase keyword as typed in commands (`/create team ...`).
    pub fn keyword(&self) -> &'static str {
        match self {
            EntityKind::Team => "team",
            EntityKind::Context(ct) => ct.keyword(),
        }
    }

    /// Plural URL segment for the REST resource.
    pub fn plural_path(&self) -> &'static str {
        match self {
            EntityKind::Team => "teams",
            EntityKind::Context(ct) => ct.plural_path(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Team => "Team",
            EntityKind::Context(ct) => ct.label(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("team") {
            return Ok(EntityKind::Team);
        }
        s.parse::<ContextType>().map(EntityKind::Context)
    }
}

/// A named entity as returned by a listing, decoded into its concrete
/// variant at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Team {
        id: Uuid,
        name: String,
    },
    Sprint {
        id: Uuid,
        name: String,
    },
    Epic {
        id: Uuid,
        name: String,
        description: Option<String>,
    },
    UserStory {
        id: Uuid,
        name: String,
        description: Option<String>,
        status: Option<String>,
    },
    Task {
        id: Uuid,
        name: String,
        description: Option<String>,
        status: Option<String>,
    },
}

impl Entity {
    pub fn id(&self) -> Uuid {
        match self {
            Entity::Team { id, .. }
            | Entity::Sprint { id, .. }
            | Entity::Epic { id, .. }
            | Entity::UserStory { id, .. }
            | Entity::Task { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Team { name, .. }
            | Entity::Sprint { name, .. }
            | Entity::Epic { name, .. }
            | Entity::UserStory { name, .. }
            | Entity::Task { name, .. } => name,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Team { .. } => EntityKind::Team,
            Entity::Sprint { .. } => EntityKind::Context(ContextType::Sprint),
            Entity::Epic { .. } => EntityKind::Context(ContextType::Epic),
            Entity::UserStory { .. } => EntityKind::Context(ContextType::UserStory),
            Entity::Task { .. } => EntityKind::Context(ContextType::Task),
        }
    }
}
