// src/handlers/rpc.rs
// Calls in a batch run in order, so a send followed by history observes the new messages.

use crate::error::status_for;
use crate::middleware::auth::resolve_claims;
use crate::rpc::{Call, Envelope, Reply, RpcError, RpcRequest, RpcResponse, RPC_PATH};
use crate::services::chat::CurrentUser;
use crate::AppState;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn rpc_routes() -> Router {
    Router::new().route(RPC_PATH, post(rpc_handler))
}

async fn rpc_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Envelope<RpcRequest>>,
) -> Response {
    // An unusable token is treated as anonymous; procedures decide what that means.
    let caller = resolve_claims(&headers, &state.settings.jwt_secret)
        .and_then(|claims| CurrentUser::try_from(&claims).ok());

    match body {
        Envelope::Single(request) => {
            let response = dispatch(&state, caller.as_ref(), request).await;
            let status = response
                .error
                .as_ref()
                .map(|e| status_for(e.code))
                .unwrap_or(StatusCode::OK);
            (status, Json(Envelope::Single(response))).into_response()
        }
        Envelope::Batch(requests) => {
            let mut responses = Vec::with_capacity(requests.len());
            for request in requests {
                responses.push(dispatch(&state, caller.as_ref(), request).await);
            }
            let status = if responses.iter().all(|r| r.error.is_none()) {
                StatusCode::OK
            } else {
                StatusCode::MULTI_STATUS
            };
            (status, Json(Envelope::Batch(responses))).into_response()
        }
    }
}

async fn dispatch(state: &AppState, caller: Option<&CurrentUser>, request: RpcRequest) -> RpcResponse {
    let procedure = request.call.procedure();
    tracing::debug!(id = request.id, procedure, authenticated = caller.is_some(), "dispatching call");

    let outcome = match request.call {
        Call::Send(input) => state.chat.send(caller, input).await.map(Reply::Send),
        Call::History => state.chat.history(caller).await.map(Reply::History),
        Call::ListModels => state.chat.list_models().await.map(Reply::ListModels),
    };

    if let Err(ref e) = outcome {
        tracing::warn!(id = request.id, procedure, code = ?e.code(), "call failed: {}", e);
    }

    RpcResponse::from_result(request.id, outcome.map_err(RpcError::from))
}
