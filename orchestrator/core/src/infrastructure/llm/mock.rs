// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-process mock provider for offline use.
//
// Selected when no provider credentials are present. Returns a canned plan
// that creates and runs the `mock-echo` agent, or a canned final when the
// user content carries the "final only" marker. The plan's child message
// carries the marker itself so the demo tree terminates after one hop.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::llm::{ChatRequest, ChatResponse, ModelError, ModelProvider};

pub const FINAL_MARKER: &str = "final only";

pub const MOCK_ECHO_SLUG: &str = "mock-echo";

const MOCK_ECHO_PROMPT: &str = "You are a mock echo agent. Reply with a single \
JSON object of type final that echoes the user message.";

const MOCK_CHILD_MESSAGE: &str = "final only: echo the demo payload";

pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let user_content = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        // The executor appends the serialized context below the user
        // message; echo only the message itself.
        let user_message = user_content
            .split("\n\nContext:\n")
            .next()
            .unwrap_or(user_content);

        let content = if user_message.contains(FINAL_MARKER) {
            json!({
                "type": "final",
                "result": { "mock": true, "echo": user_message },
            })
        } else {
            json!({
                "type": "plan",
                "agentsToCreate": [{
                    "slug": MOCK_ECHO_SLUG,
                    "name": "Mock Echo",
                    "description": "Echoes input for offline demos.",
                    "systemPrompt": MOCK_ECHO_PROMPT,
                    "routingHints": { "tags": ["specialist", "domain:demo"] },
                }],
                "runsToExecute": [{
                    "slug": MOCK_ECHO_SLUG,
                    "userMessage": MOCK_CHILD_MESSAGE,
                }],
            })
        };

        Ok(ChatResponse {
            content: content.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
