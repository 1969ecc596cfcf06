// src/error.rs
use crate::rpc::{ErrorCode, RpcError};
use crate::store::StoreError;
use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Which append of a `send` call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageHalf {
    UserMessage,
    AssistantReply,
}

impl fmt::Display for MessageHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageHalf::UserMessage => f.write_str("user message"),
            MessageHalf::AssistantReply => f.write_str("assistant reply"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid model tag: {0}")]
    InvalidModel(String),

    #[error("Failed to store {half}")]
    StorageFailure {
        half: MessageHalf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch message history")]
    HistoryUnavailable(#[source] StoreError),

    #[error("Failed to fetch models")]
    ModelsUnavailable(#[source] StoreError),

    #[error("{0}")]
    ValidationFailure(String),
}

impl ChatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::Unauthorized => ErrorCode::Unauthorized,
            ChatError::InvalidModel(_) => ErrorCode::InvalidModel,
            ChatError::StorageFailure { .. } => ErrorCode::StorageFailure,
            ChatError::HistoryUnavailable(_) => ErrorCode::HistoryUnavailable,
            ChatError::ModelsUnavailable(_) => ErrorCode::ModelsUnavailable,
            ChatError::ValidationFailure(_) => ErrorCode::ValidationFailure,
        }
    }
}

impl From<ChatError> for RpcError {
    fn from(err: ChatError) -> Self {
        RpcError::new(err.code(), err.to_string())
    }
}

/// HTTP status used when a single (unbatched) call fails.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::InvalidModel | ErrorCode::ValidationFailure => StatusCode::BAD_REQUEST,
        ErrorCode::StorageFailure | ErrorCode::HistoryUnavailable | ErrorCode::ModelsUnavailable => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
