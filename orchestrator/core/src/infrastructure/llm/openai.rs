// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Chat Completions Adapter
//
// Anti-Corruption Layer for the OpenAI API. Requests JSON-object responses
// so agent output parses strictly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::llm::{ChatMessage, ChatRequest, ChatResponse, ModelError, ModelProvider};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Longest error-body prefix carried into [`ModelError::Http`].
const BODY_PREFIX_LEN: usize = 300;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: OPENAI_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let body = OpenAiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
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

        let parsed: OpenAiResponse = response
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
        "openai"
    }
}

pub(crate) fn body_prefix(text: &str) -> String {
    text.chars().take(BODY_PREFIX_LEN).collect()
}
