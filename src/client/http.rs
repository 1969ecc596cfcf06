// src/client/http.rs
use super::{ChatApi, ClientError};
use crate::models::{
    auth::{AuthResponse, ErrorResponse, LoginRequest, SignUpRequest, UserResponse},
    catalog::Model,
    chat::Message,
};
use crate::rpc::{Call, Envelope, Reply, RpcError, RpcRequest, RpcResponse, SendInput, SendOutput, RPC_PATH};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcomes of the dashboard's initial calls; each can fail on its own.
pub struct Prefetched {
    pub models: Result<Vec<Model>, ClientError>,
    pub history: Result<Vec<Message>, ClientError>,
}

pub struct HttpRpcClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    next_id: AtomicU32,
}

impl HttpRpcClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            next_id: AtomicU32::new(1),
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/api/auth/login", &request).await
    }

    pub async fn sign_up(&mut self, email: &str, password: &str, confirm_password: &str) -> Result<UserResponse, ClientError> {
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        };
        self.authenticate("/api/auth/sign-up", &request).await
    }

    pub fn sign_out(&mut self) {
        self.token = None;
    }

    pub async fn current_user(&self) -> Result<Option<UserResponse>, ClientError> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let response = self
            .http
            .get(format!("{}/api/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(auth_failure(response).await);
        }
        Ok(Some(response.json::<UserResponse>().await?))
    }

    /// Models and history in a single round trip.
    pub async fn prefetch(&self) -> Result<Prefetched, ClientError> {
        let mut results = self.call_batch(vec![Call::ListModels, Call::History]).await?.into_iter();
        let (Some(models), Some(history)) = (results.next(), results.next()) else {
            return Err(ClientError::Protocol("batch reply is missing entries".to_string()));
        };
        Ok(Prefetched {
            models: models.map_err(ClientError::from).and_then(expect_models),
            history: history.map_err(ClientError::from).and_then(expect_history),
        })
    }

    /// Sends `calls` in one request and returns their outcomes in call order.
    pub async fn call_batch(&self, calls: Vec<Call>) -> Result<Vec<Result<Reply, RpcError>>, ClientError> {
        let requests: Vec<RpcRequest> = calls
            .into_iter()
            .map(|call| RpcRequest {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                call,
            })
            .collect();
        let ids: Vec<u32> = requests.iter().map(|r| r.id).collect();

        let mut builder = self
            .http
            .post(format!("{}{}", self.base_url, RPC_PATH))
            .json(&Envelope::Batch(requests));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Protocol(format!("rpc endpoint returned {}", status)));
        }

        let mut responses = match response.json::<Envelope<RpcResponse>>().await? {
            Envelope::Batch(responses) => responses,
            Envelope::Single(response) => vec![response],
        };
        match_responses(&ids, &mut responses)
    }

    async fn call(&self, call: Call) -> Result<Reply, ClientError> {
        let procedure = call.procedure();
        let outcome = self
            .call_batch(vec![call])
            .await?
            .pop()
            .ok_or_else(|| ClientError::Protocol(format!("no reply for {}", procedure)))?;
        Ok(outcome?)
    }

    async fn authenticate<T: serde::Serialize>(&mut self, path: &str, body: &T) -> Result<UserResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_failure(response).await);
        }

        let auth = response.json::<AuthResponse>().await?;
        tracing::debug!(user_id = %auth.user.id, "authenticated");
        self.token = Some(auth.token);
        Ok(auth.user)
    }
}

async fn auth_failure(response: reqwest::Response) -> ClientError {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => ClientError::Auth(body.message),
        Err(_) => ClientError::Auth(format!("authentication failed ({})", status)),
    }
}

/// Orders `responses` to follow `ids`.
fn match_responses(ids: &[u32], responses: &mut Vec<RpcResponse>) -> Result<Vec<Result<Reply, RpcError>>, ClientError> {
    ids.iter()
        .map(|id| {
            let index = responses
                .iter()
                .position(|r| r.id == *id)
                .ok_or_else(|| ClientError::Protocol(format!("no reply for call {}", id)))?;
            Ok(responses.swap_remove(index).into_result())
        })
        .collect()
}

fn expect_send(reply: Reply) -> Result<SendOutput, ClientError> {
    match reply {
        Reply::Send(output) => Ok(output),
        other => Err(unexpected(&other)),
    }
}

fn expect_history(reply: Reply) -> Result<Vec<Message>, ClientError> {
    match reply {
        Reply::History(messages) => Ok(messages),
        other => Err(unexpected(&other)),
    }
}

fn expect_models(reply: Reply) -> Result<Vec<Model>, ClientError> {
    match reply {
        Reply::ListModels(models) => Ok(models),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(reply: &Reply) -> ClientError {
    let procedure = match reply {
        Reply::Send(_) => crate::rpc::SEND,
        Reply::History(_) => crate::rpc::HISTORY,
        Reply::ListModels(_) => crate::rpc::LIST_MODELS,
    };
    ClientError::Protocol(format!("unexpected {} reply", procedure))
}

#[async_trait]
impl ChatApi for HttpRpcClient {
    async fn send(&self, input: SendInput) -> Result<SendOutput, ClientError> {
        self.call(Call::Send(input)).await.and_then(expect_send)
    }

    async fn history(&self) -> Result<Vec<Message>, ClientError> {
        self.call(Call::History).await.and_then(expect_history)
    }

    async fn list_models(&self) -> Result<Vec<Model>, ClientError> {
        self.call(Call::ListModels).await.and_then(expect_models)
    }
}
