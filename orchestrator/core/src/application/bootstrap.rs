// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Seed agents: the hidden bootstrap agent used when a run names no agent,
// and the visible directory router seeded at startup.

use serde_json::json;
use tracing::info;

use crate::domain::agent::{
    Actor, Agent, AgentId, AgentMetadata, AgentRole, AgentVersion, RoutingHints,
};
use crate::domain::error::EngineError;
use crate::domain::repository::{Store, StoreError};

pub const BOOTSTRAP_SLUG: &str = "bootstrap";
pub const BOOTSTRAP_NAME: &str = "Bootstrap";

const BOOTSTRAP_PROMPT: &str = "You are the bootstrap agent of an agent orchestration engine. \
Inspect the user request and the provided context. Either answer directly with a final result, \
or produce a plan that creates the agents the request needs and executes them. \
Prefer reusing agents listed in the context over creating new ones.";

const DIRECTORY_PROMPT: &str = "You are the agent directory and cross-domain router. \
You see the full agent roster in your context. Route each request to the most \
relevant domain router, or answer directly when no agent fits.";

/// Load the bootstrap agent together with its active version, creating both
/// on first use. Two concurrent roots may race the insert; the loser
/// re-reads the winner's row.
pub async fn ensure_bootstrap_agent(store: &Store) -> Result<(Agent, AgentVersion), EngineError> {
    if let Some(agent) = store.agents.find_by_slug(BOOTSTRAP_SLUG).await? {
        let version = store
            .agents
            .find_version(agent.active_version_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Agent version not found"))?;
        return Ok((agent, version));
    }

    let agent_id = AgentId::new();
    let version = AgentVersion::new(
        agent_id,
        1,
        BOOTSTRAP_PROMPT,
        RoutingHints::default(),
        Actor::System,
    );
    let now = chrono::Utc::now();
    let agent = Agent {
        id: agent_id,
        slug: BOOTSTRAP_SLUG.to_string(),
        name: BOOTSTRAP_NAME.to_string(),
        description: "Entry point agent used when a run names no agent.".to_string(),
        active_version_id: version.id,
        created_at: now,
        updated_at: now,
        created_by: Actor::System,
        metadata: AgentMetadata {
            role: Some(AgentRole::System),
            hidden: true,
            system: true,
            ..Default::default()
        },
    };

    match store.agents.insert(&agent).await {
        Ok(()) => {
            store.agents.insert_version(&version).await?;
            info!(slug = BOOTSTRAP_SLUG, "bootstrap agent created");
            Ok((agent, version))
        }
        Err(StoreError::Duplicate(_)) => {
            let agent = store
                .agents
                .find_by_slug(BOOTSTRAP_SLUG)
                .await?
                .ok_or_else(|| EngineError::not_found("Agent not found"))?;
            let version = store
                .agents
                .find_version(agent.active_version_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Agent version not found"))?;
            Ok((agent, version))
        }
        Err(e) => Err(e.into()),
    }
}

/// Seed the directory router at startup when absent.
pub async fn seed_directory_agent(
    store: &Store,
    slug: &str,
    name: &str,
) -> Result<(), EngineError> {
    if store.agents.find_by_slug(slug).await?.is_some() {
        return Ok(());
    }

    let agent_id = AgentId::new();
    let version = AgentVersion::new(
        agent_id,
        1,
        DIRECTORY_PROMPT,
        RoutingHints {
            tags: vec!["router".to_string(), "domain-router".to_string()],
            ..Default::default()
        },
        Actor::System,
    );
    let now = chrono::Utc::now();
    let agent = Agent {
        id: agent_id,
        slug: slug.to_string(),
        name: name.to_string(),
        description: "Agent directory and cross-domain router.".to_string(),
        active_version_id: version.id,
        created_at: now,
        updated_at: now,
        created_by: Actor::System,
        metadata: AgentMetadata {
            role: Some(AgentRole::Router),
            tags: vec!["router".to_string(), "domain-router".to_string()],
            system: true,
            card: Some(json!({
                "protocolVersion": "0.3.0",
                "name": name,
                "description": "Agent directory and cross-domain router.",
                "skills": [{
                    "id": slug,
                    "name": name,
                    "tags": ["router", "domain-router"],
                }],
            })),
            ..Default::default()
        },
    };

    match store.agents.insert(&agent).await {
        Ok(()) => {
            store.agents.insert_version(&version).await?;
            info!(slug, "directory agent seeded");
            Ok(())
        }
        // Concurrent seeders are fine, first write wins.
        Err(StoreError::Duplicate(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
