// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider selection is deterministic and process-local: Fireworks when its
// key is present, else OpenAI, else the in-process mock. The decision is
// made once at construction from the loaded config; later environment
// changes do not flip providers mid-run.

pub mod fireworks;
pub mod mock;
pub mod openai;

use std::sync::Arc;
use tracing::info;

use crate::domain::llm::ModelProvider;
use crate::infrastructure::config::EngineConfig;

pub use fireworks::FireworksProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

pub fn provider_from_config(config: &EngineConfig) -> Arc<dyn ModelProvider> {
    let provider: Arc<dyn ModelProvider> = if let Some(key) = &config.fireworks_api_key {
        Arc::new(FireworksProvider::new(
            key.clone(),
            config.fireworks_model.clone(),
        ))
    } else if let Some(key) = &config.openai_api_key {
        Arc::new(OpenAiProvider::new(key.clone()))
    } else {
        Arc::new(MockProvider::new())
    };

    info!(provider = provider.name(), "model provider selected");
    provider
}
