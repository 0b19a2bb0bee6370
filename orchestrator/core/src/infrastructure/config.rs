// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine configuration, read once from the process environment at startup.
// Later environment changes do not flip providers or limits mid-run.

use crate::application::executor::{ExecutorSettings, RoutingPolicy};
use crate::domain::repository::StorageBackend;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_DEPTH: u64 = 2;
pub const DEFAULT_MAX_CHILDREN: u64 = 3;
pub const DEFAULT_ROUTER_INDEX_LIMIT: u64 = 50;
pub const DEFAULT_SPECIALIST_INDEX_LIMIT: u64 = 50;
pub const DEFAULT_MAIN_ROUTER_SLUG: &str = "main-router";
pub const DEFAULT_MAIN_ROUTER_NAME: &str = "Main Router";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub model_name: String,
    pub openai_api_key: Option<String>,
    pub fireworks_api_key: Option<String>,
    pub fireworks_model: Option<String>,
    pub max_depth: u32,
    pub max_children: usize,
    pub router_index_limit: usize,
    pub specialist_index_limit: usize,
    pub main_router_slug: String,
    pub main_router_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            model_name: DEFAULT_MODEL.to_string(),
            openai_api_key: None,
            fireworks_api_key: None,
            fireworks_model: None,
            max_depth: DEFAULT_MAX_DEPTH as u32,
            max_children: DEFAULT_MAX_CHILDREN as usize,
            router_index_limit: DEFAULT_ROUTER_INDEX_LIMIT as usize,
            specialist_index_limit: DEFAULT_SPECIALIST_INDEX_LIMIT as usize,
            main_router_slug: DEFAULT_MAIN_ROUTER_SLUG.to_string(),
            main_router_name: DEFAULT_MAIN_ROUTER_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            port: positive_or_default(env_var("PORT"), DEFAULT_PORT as u64) as u16,
            database_url: env_var("DATABASE_URL"),
            model_name: env_var("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_api_key: env_var("OPENAI_API_KEY"),
            fireworks_api_key: env_var("FIREWORKS_API_KEY"),
            fireworks_model: env_var("FIREWORKS_MODEL"),
            max_depth: positive_or_default(env_var("A2A_MAX_DEPTH"), DEFAULT_MAX_DEPTH) as u32,
            max_children: positive_or_default(env_var("A2A_MAX_CHILDREN"), DEFAULT_MAX_CHILDREN)
                as usize,
            router_index_limit: positive_or_default(
                env_var("A2A_ROUTER_INDEX_LIMIT"),
                DEFAULT_ROUTER_INDEX_LIMIT,
            ) as usize,
            specialist_index_limit: positive_or_default(
                env_var("A2A_SPECIALIST_INDEX_LIMIT"),
                DEFAULT_SPECIALIST_INDEX_LIMIT,
            ) as usize,
            main_router_slug: env_var("MAIN_ROUTER_SLUG")
                .unwrap_or_else(|| DEFAULT_MAIN_ROUTER_SLUG.to_string()),
            main_router_name: env_var("MAIN_ROUTER_NAME")
                .unwrap_or_else(|| DEFAULT_MAIN_ROUTER_NAME.to_string()),
        }
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match &self.database_url {
            Some(url) => StorageBackend::Postgres {
                connection_string: url.clone(),
            },
            None => StorageBackend::InMemory,
        }
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            model_name: self.model_name.clone(),
            policy: RoutingPolicy {
                max_depth: self.max_depth,
                max_children: self.max_children,
            },
            router_index_limit: self.router_index_limit,
            specialist_index_limit: self.specialist_index_limit,
            directory_slug: self.main_router_slug.clone(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a positive integer, falling back to the default on anything else.
fn positive_or_default(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
