// src/services/chat.rs
use crate::error::{ChatError, MessageHalf};
use crate::models::{
    auth::Claims,
    catalog::Model,
    chat::{Message, NewMessage},
};
use crate::rpc::{SendInput, SendOutput};
use crate::services::responder::Responder;
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// The authenticated caller of a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl TryFrom<&Claims> for CurrentUser {
    type Error = ChatError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| ChatError::Unauthorized)?;
        Ok(Self {
            id,
            email: claims.email.clone(),
        })
    }
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
    responder: Arc<dyn Responder>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>, responder: Arc<dyn Responder>) -> Self {
        Self { store, responder }
    }

    /// Persists the prompt, produces a reply and persists it too.
    ///
    /// The two appends are independent: when the reply fails to persist the
    /// prompt stays stored and the call reports `StorageFailure`.
    pub async fn send(&self, caller: Option<&CurrentUser>, input: SendInput) -> Result<SendOutput, ChatError> {
        let user = caller.ok_or(ChatError::Unauthorized)?;

        if input.prompt.is_empty() {
            return Err(ChatError::ValidationFailure("Message cannot be empty".to_string()));
        }

        let model = self.store.find_model(&input.model_tag).await.map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "model lookup failed");
            ChatError::ModelsUnavailable(e)
        })?;
        if model.is_none() {
            tracing::warn!(user_id = %user.id, model_tag = %input.model_tag, "send rejected: unknown model");
            return Err(ChatError::InvalidModel(input.model_tag));
        }

        let user_at = Utc::now();
        self.store
            .append_message(NewMessage::user(user.id, &input.model_tag, &input.prompt, user_at))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "failed to store user message");
                ChatError::StorageFailure {
                    half: MessageHalf::UserMessage,
                    source: e,
                }
            })?;

        let response = self.responder.respond(&input.model_tag, &input.prompt).await;

        let assistant_at = Utc::now().max(user_at);
        self.store
            .append_message(NewMessage::assistant(user.id, &input.model_tag, &response, assistant_at))
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    "failed to store assistant reply; user message remains without a reply"
                );
                ChatError::StorageFailure {
                    half: MessageHalf::AssistantReply,
                    source: e,
                }
            })?;

        tracing::info!(user_id = %user.id, model_tag = %input.model_tag, "message exchange stored");
        Ok(SendOutput { response })
    }

    pub async fn history(&self, caller: Option<&CurrentUser>) -> Result<Vec<Message>, ChatError> {
        let user = caller.ok_or(ChatError::Unauthorized)?;

        let messages = self.store.messages_for_user(user.id).await.map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "failed to read message history");
            ChatError::HistoryUnavailable(e)
        })?;

        tracing::debug!(user_id = %user.id, count = messages.len(), "history loaded");
        Ok(messages)
    }

    pub async fn list_models(&self) -> Result<Vec<Model>, ChatError> {
        self.store.list_models().await.map_err(|e| {
            tracing::error!(error = %e, "failed to list models");
            ChatError::ModelsUnavailable(e)
        })
    }
}
