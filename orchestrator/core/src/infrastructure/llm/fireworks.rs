// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fireworks Chat Completions Adapter
//
// OpenAI-compatible wire shape; the deployment's FIREWORKS_MODEL overrides
// the per-request model name when set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::llm::{ChatMessage, ChatRequest, ChatResponse, ModelError, ModelProvider};

use super::openai::body_prefix;

const FIREWORKS_ENDPOINT: &str = "https://api.fireworks.ai/inference/v1/chat/completions";

pub struct FireworksProvider {
    client: reqwest::Client,
    api_key: String,
    model_override: Option<String>,
}

#[derive(Serialize)]
struct FireworksRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct FireworksResponse {
    choices: Vec<FireworksChoice>,
}

#[derive(Deserialize)]
struct FireworksChoice {
    message: FireworksMessage,
}

#[derive(Deserialize)]
struct FireworksMessage {
    content: Option<String>,
}

impl FireworksProvider {
    pub fn new(api_key: String, model_override: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model_override,
        }
    }
}

#[async_trait]
impl ModelProvider for FireworksProvider {
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let model = self
            .model_override
            .as_deref()
            .unwrap_or(request.model.as_str());

        let body = FireworksRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(FIREWORKS_ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Http {
                status,
                body: body_prefix(&text),
            });
        }

        let parsed: FireworksResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(ModelError::MissingContent)?;

        Ok(ChatResponse { content })
    }

    fn name(&self) -> &'static str {
        "fireworks"
    }
}
