use super::{ensure_persistable, MessageStore, ModelCatalog, StoreError, UserStore};
use crate::models::{
    auth::User,
    catalog::Model,
    chat::{Message, NewMessage, Role},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

type MessageRow = (Uuid, String, String, String, DateTime<Utc>);

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn message_from_row((user_id, model_tag, role, content, created_at): MessageRow) -> Result<Message, StoreError> {
    let role = role.parse::<Role>().map_err(StoreError::CorruptRow)?;
    Ok(Message {
        user_id: user_id.to_string(),
        model_tag,
        role,
        content,
        created_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        ensure_persistable(&message)?;

        sqlx::query(
            "INSERT INTO messages (user_id, model_tag, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.user_id)
        .bind(&message.model_tag)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message.into_message())
    }

    async fn messages_for_user(&self, user_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT user_id, model_tag, role, content, created_at
             FROM messages
             WHERE user_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

#[async_trait]
impl ModelCatalog for PgStore {
    async fn list_models(&self) -> Result<Vec<Model>, StoreError> {
        let models = sqlx::query_as::<_, Model>("SELECT tag, name, created_at FROM models ORDER BY tag ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(models)
    }

    async fn find_model(&self, tag: &str) -> Result<Option<Model>, StoreError> {
        let model = sqlx::query_as::<_, Model>("SELECT tag, name, created_at FROM models WHERE tag = $1")
            .bind(tag)
            .fetch_optional(&self.pool)
            .await?;
        Ok(model)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES ($1, $2, $3, NOW())
             RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!("user {}", email))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, password_hash, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
