use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An entry of the model catalog. Messages reference it by `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Model {
    pub tag: String,
    pub name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Model {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: None,
            created_at: chrono::Utc::now(),
        }
    }
}
