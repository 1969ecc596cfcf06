// src/rpc.rs
// Wire shape: {"id": 1, "call": {"procedure": "chat.send", "input": {...}}} in,
// {"id": 1, "result": {...}} or {"id": 1, "error": {"code": ..., "message": ...}} out.
// A JSON array carries a batch.

use crate::models::{catalog::Model, chat::Message};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RPC_PATH: &str = "/api/rpc";

pub const SEND: &str = "chat.send";
pub const HISTORY: &str = "chat.history";
pub const LIST_MODELS: &str = "models.getAvailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInput {
    pub model_tag: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutput {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "procedure", content = "input")]
pub enum Call {
    #[serde(rename = "chat.send")]
    Send(SendInput),
    #[serde(rename = "chat.history")]
    History,
    #[serde(rename = "models.getAvailable")]
    ListModels,
}

impl Call {
    pub fn procedure(&self) -> &'static str {
        match self {
            Call::Send(_) => SEND,
            Call::History => HISTORY,
            Call::ListModels => LIST_MODELS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "procedure", content = "data")]
pub enum Reply {
    #[serde(rename = "chat.send")]
    Send(SendOutput),
    #[serde(rename = "chat.history")]
    History(Vec<Message>),
    #[serde(rename = "models.getAvailable")]
    ListModels(Vec<Model>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InvalidModel,
    StorageFailure,
    HistoryUnavailable,
    ModelsUnavailable,
    ValidationFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u32,
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn from_result(id: u32, outcome: Result<Reply, RpcError>) -> Self {
        match outcome {
            Ok(reply) => Self {
                id,
                result: Some(reply),
                error: None,
            },
            Err(error) => Self {
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub fn into_result(self) -> Result<Reply, RpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(reply), None) => Ok(reply),
            (None, None) => Err(RpcError::new(
                ErrorCode::ValidationFailure,
                format!("response {} carried neither result nor error", self.id),
            )),
        }
    }
}

/// One call or a batch of calls; the reply mirrors the request's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Batch(Vec<T>),
    Single(T),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_call_uses_camel_case_input() {
        let request = RpcRequest {
            id: 7,
            call: Call::Send(SendInput {
                model_tag: "gpt-4o".into(),
                prompt: "hello".into(),
            }),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 7, "call": {"procedure": "chat.send", "input": {"modelTag": "gpt-4o", "prompt": "hello"}}})
        );
    }

    #[test]
    fn history_call_needs_no_input() {
        let request: RpcRequest = serde_json::from_value(json!({"id": 1, "call": {"procedure": "chat.history"}})).unwrap();
        assert_eq!(request.call, Call::History);
        assert_eq!(request.call.procedure(), HISTORY);
    }

    #[test]
    fn envelope_accepts_single_calls_and_batches() {
        let single: Envelope<RpcRequest> =
            serde_json::from_value(json!({"id": 1, "call": {"procedure": "models.getAvailable"}})).unwrap();
        assert!(matches!(single, Envelope::Single(_)));

        let batch: Envelope<RpcRequest> = serde_json::from_value(json!([
            {"id": 1, "call": {"procedure": "models.getAvailable"}},
            {"id": 2, "call": {"procedure": "chat.history"}}
        ]))
        .unwrap();
        match batch {
            Envelope::Batch(calls) => assert_eq!(calls.len(), 2),
            Envelope::Single(_) => panic!("expected a batch"),
        }
    }

    #[test]
    fn error_responses_carry_codes() {
        let response = RpcResponse::from_result(3, Err(RpcError::new(ErrorCode::InvalidModel, "Invalid model tag: nope")));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"id": 3, "error": {"code": "INVALID_MODEL", "message": "Invalid model tag: nope"}}));

        let back: RpcResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back.into_result().unwrap_err().code, ErrorCode::InvalidModel);
    }

    #[test]
    fn empty_history_reply_stays_a_history_reply() {
        let value = serde_json::to_value(Reply::History(vec![])).unwrap();
        assert_eq!(value, json!({"procedure": "chat.history", "data": []}));
        let reply: Reply = serde_json::from_value(value).unwrap();
        assert_eq!(reply, Reply::History(vec![]));
    }
}
