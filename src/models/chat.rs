// src/models/chat.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Author id carried by messages synthesized on the client (welcome, errors).
pub const SYSTEM_AUTHOR: &str = "system";
/// Author id carried by assistant replies rendered on the client.
pub const ASSISTANT_AUTHOR: &str = "assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Only user prompts and assistant replies ever reach the store.
    pub fn is_persistable(&self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        match role {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

/// A chat message as returned by `chat.history` and rendered by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: String,
    pub model_tag: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Client-only message with no model association.
    pub fn synthetic(role: Role, content: impl Into<String>) -> Self {
        Self {
            user_id: SYSTEM_AUTHOR.to_string(),
            model_tag: String::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A message about to be appended to the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: Uuid,
    pub model_tag: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn user(user_id: Uuid, model_tag: &str, content: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            model_tag: model_tag.to_string(),
            role: Role::User,
            content: content.to_string(),
            created_at,
        }
    }

    pub fn assistant(user_id: Uuid, model_tag: &str, content: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(user_id, model_tag, content, created_at)
        }
    }

    pub fn into_message(self) -> Message {
        Message {
            user_id: self.user_id.to_string(),
            model_tag: self.model_tag,
            role: self.role,
            content: self.content,
            created_at: self.created_at,
        }
    }
}
