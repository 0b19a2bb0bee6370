// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::application::executor::RunExecutor;
use crate::application::workflow_runner::WorkflowRunner;
use crate::domain::repository::Store;
use crate::presentation::rpc::{dispatch, RpcRequest};

pub struct AppState {
    pub store: Store,
    pub executor: Arc<RunExecutor>,
    pub workflows: WorkflowRunner,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/.well-known/agent-card.json", get(agent_card))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let request: RpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Malformed JSON-RPC envelope" })),
            )
        }
    };
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Malformed JSON-RPC envelope" })),
        );
    }

    let response = match dispatch(&state, &request.method, request.params).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "id": request.id,
            "result": result,
        }),
        Err(failure) => json!({
            "jsonrpc": "2.0",
            "id": request.id,
            "error": { "code": failure.code, "message": failure.message },
        }),
    };
    (StatusCode::OK, Json(response))
}

#[derive(Deserialize)]
struct CardQuery {
    #[serde(default)]
    slug: Option<String>,
}

/// A2A well-known endpoint serving `agent.metadata.card`.
async fn agent_card(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CardQuery>,
) -> impl IntoResponse {
    let slug = match query.slug {
        Some(slug) if !slug.trim().is_empty() => slug,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "slug query parameter required" })),
            )
        }
    };

    let agent = match state.store.agents.find_by_slug(&slug).await {
        Ok(Some(agent)) => agent,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Agent not found" })),
            )
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    };

    match agent.metadata.card {
        Some(card) => (StatusCode::OK, Json(card)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Agent card not found" })),
        ),
    }
}
