// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentVersionId(pub Uuid);

impl AgentVersionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentVersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentVersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who created an agent or version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    System,
    User,
    Agent,
}

/// Routing role assigned to an agent. Routers dispatch to specialists;
/// specialists may delegate to at most one router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    System,
    Router,
    Specialist,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::System => write!(f, "system"),
            AgentRole::Router => write!(f, "router"),
            AgentRole::Specialist => write!(f, "specialist"),
        }
    }
}

/// Provenance recorded on every agent spawned out of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOrigin {
    pub parent_run_id: Option<crate::domain::run::RunId>,
    pub root_run_id: Option<crate::domain::run::RunId>,
    pub created_by_agent_id: Option<AgentId>,
    pub user_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AgentRole>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub system: bool,
    /// A2A card exposed at /.well-known/agent-card.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<AgentOrigin>,
}

/// Stable agent identity. Prompt content lives in [`AgentVersion`];
/// `active_version_id` must reference a version whose `agent_id` is this agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub active_version_id: AgentVersionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Actor,
    pub metadata: AgentMetadata,
}

impl Agent {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        active_version_id: AgentVersionId,
        created_by: Actor,
        metadata: AgentMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            slug: slug.into(),
            name: name.into(),
            description: description.into(),
            active_version_id,
            created_at: now,
            updated_at: now,
            created_by,
            metadata,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingHints {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Immutable snapshot of an agent's prompt and configuration.
/// `(agent_id, version)` is unique; version numbers are contiguous from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVersion {
    pub id: AgentVersionId,
    pub agent_id: AgentId,
    pub version: u32,
    pub system_prompt: String,
    #[serde(default)]
    pub resources: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_schema: Option<Value>,
    #[serde(default)]
    pub routing_hints: RoutingHints,
    pub created_at: DateTime<Utc>,
    pub created_by: Actor,
}

impl AgentVersion {
    pub fn new(
        agent_id: AgentId,
        version: u32,
        system_prompt: impl Into<String>,
        routing_hints: RoutingHints,
        created_by: Actor,
    ) -> Self {
        Self {
            id: AgentVersionId::new(),
            agent_id,
            version,
            system_prompt: system_prompt.into(),
            resources: Vec::new(),
            io_schema: None,
            routing_hints,
            created_at: Utc::now(),
            created_by,
        }
    }
}
