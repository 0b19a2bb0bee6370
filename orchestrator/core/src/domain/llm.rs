// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Model Provider Domain Interface (Anti-Corruption Layer)
//
// Defines the chat-completion interface the run executor calls. Prevents
// vendor lock-in by abstracting external LLM APIs.
//
// Implementations in infrastructure/llm/ directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Domain interface for chat-completion providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Issue one chat request and return the assistant text. No retries.
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError>;

    /// Provider name for logging ("openai", "fireworks", "mock").
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
}

/// Errors from model providers.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model call failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Model response missing content")]
    MissingContent,

    #[error("Model returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Network error: {0}")]
    Network(String),
}
