// src/client/mod.rs
pub mod cache;
pub mod conversation;
pub mod form;
pub mod http;
pub mod scroll;
pub mod session;

use crate::models::{catalog::Model, chat::Message};
use crate::rpc::{RpcError, SendInput, SendOutput};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub use conversation::{Conversation, Entry, HistoryState};
pub use form::{ChatForm, FormEvent, Key, Submission};
pub use http::HttpRpcClient;
pub use session::ChatSession;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Rpc(#[from] RpcError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Auth(String),

    #[error("unexpected reply: {0}")]
    Protocol(String),

    #[error("{0}")]
    Validation(String),

    #[error("a message is already being sent")]
    SubmissionInFlight,

    #[error("request cancelled")]
    Cancelled,
}

/// Identifies one submission from optimistic insert to resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The procedures as seen from the client.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send(&self, input: SendInput) -> Result<SendOutput, ClientError>;

    async fn history(&self) -> Result<Vec<Message>, ClientError>;

    async fn list_models(&self) -> Result<Vec<Model>, ClientError>;
}
