// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod llm;
pub mod store;

pub use config::EngineConfig;
pub use llm::provider_from_config;
pub use store::{create_store, memory_store};
