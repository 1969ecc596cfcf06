// src/store/mod.rs
pub mod memory;
pub mod postgres;

use crate::models::{
    auth::User,
    catalog::Model,
    chat::{Message, NewMessage, Role},
};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("refusing to persist a {0} message")]
    NotPersistable(Role),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only message log keyed by user and model.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends one message. Rejects roles that are not persistable.
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// All messages of `user_id`, ascending by `created_at`, ties in insertion order.
    async fn messages_for_user(&self, user_id: Uuid) -> Result<Vec<Message>, StoreError>;
}

#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<Model>, StoreError>;

    async fn find_model(&self, tag: &str) -> Result<Option<Model>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

/// Everything the server needs from its persistence layer.
pub trait Store: MessageStore + ModelCatalog + UserStore {}

impl<T: MessageStore + ModelCatalog + UserStore> Store for T {}

pub(crate) fn ensure_persistable(message: &NewMessage) -> Result<(), StoreError> {
    if message.role.is_persistable() {
        Ok(())
    } else {
        Err(StoreError::NotPersistable(message.role))
    }
}
