use super::{ensure_persistable, MessageStore, ModelCatalog, StoreError, UserStore};
use crate::models::{
    auth::User,
    catalog::Model,
    chat::{Message, NewMessage},
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    models: Vec<Model>,
    // (owner, message) in insertion order
    messages: Vec<(Uuid, Message)>,
}

/// Process-local store used when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut models: Vec<Model> = Vec::new();
        for tag in tags {
            let model = Model::new(tag);
            if !models.iter().any(|m| m.tag == model.tag) {
                models.push(model);
            }
        }
        let inner = Inner {
            models,
            ..Inner::default()
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub async fn add_model(&self, model: Model) {
        let mut inner = self.inner.write().await;
        if !inner.models.iter().any(|m| m.tag == model.tag) {
            inner.models.push(model);
        }
    }

    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        ensure_persistable(&message)?;
        let owner = message.user_id;
        let stored = message.into_message();
        self.inner.write().await.messages.push((owner, stored.clone()));
        Ok(stored)
    }

    async fn messages_for_user(&self, user_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, message)| message.clone())
            .collect();
        // stable: equal timestamps keep insertion order
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[async_trait]
impl ModelCatalog for MemoryStore {
    async fn list_models(&self) -> Result<Vec<Model>, StoreError> {
        Ok(self.inner.read().await.models.clone())
    }

    async fn find_model(&self, tag: &str) -> Result<Option<Model>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.models.iter().find(|m| m.tag == tag).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::Conflict(format!("user {}", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: chrono::Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }
}
