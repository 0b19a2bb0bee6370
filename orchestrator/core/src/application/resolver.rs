// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Resolver
//!
//! Matches a plan's agent spec against the existing roster and decides
//! between reuse, appending a new version, and inserting a new agent.
//!
//! The slug → name → tags search is a best-effort content-addressed lookup,
//! not a transaction. Two simultaneous plans proposing the same new slug
//! both observe "no match"; the unique-slug index fails one of the inserts
//! and that run fails, which is the accepted outcome.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::agent::{
    Actor, Agent, AgentId, AgentMetadata, AgentOrigin, AgentVersion, AgentVersionId, RoutingHints,
};
use crate::domain::error::EngineError;
use crate::domain::repository::Store;
use crate::domain::routing::{
    extract_domains_from_tags, infer_domain_from_label, infer_role_from_tags, merge_unique,
    normalize_strings,
};

/// Agent specification carried in a plan's `agentsToCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub resources: Vec<Value>,
    #[serde(default)]
    pub io_schema: Option<Value>,
    #[serde(default)]
    pub routing_hints: Option<RoutingHints>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl AgentSpec {
    /// Union of normalized routing-hint tags and metadata tags.
    pub fn effective_tags(&self) -> Vec<String> {
        let hint_tags = self
            .routing_hints
            .as_ref()
            .map(|h| normalize_strings(&h.tags))
            .unwrap_or_default();
        let metadata_tags = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("tags"))
            .and_then(|t| t.as_array())
            .map(|items| normalize_strings(items.iter().filter_map(|i| i.as_str())))
            .unwrap_or_default();
        merge_unique(&hint_tags, &metadata_tags)
    }
}

/// Outcome of resolving one agent spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResolution {
    pub requested_slug: String,
    pub slug: String,
    pub agent_id: AgentId,
    pub agent_version_id: AgentVersionId,
    pub reused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_new_agent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_new_version: Option<bool>,
}

#[derive(Clone)]
pub struct AgentResolver {
    store: Store,
}

impl AgentResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve one spec. Running the same plan twice with identical specs
    /// yields no new versions.
    pub async fn resolve(
        &self,
        spec: &AgentSpec,
        origin: AgentOrigin,
    ) -> Result<AgentResolution, EngineError> {
        let requested_slug = spec.slug.trim().to_string();
        let effective_tags = spec.effective_tags();

        let matched = self.find_match(&requested_slug, spec, &effective_tags).await?;

        match matched {
            None => self.create_agent(spec, &requested_slug, &effective_tags, origin).await,
            Some((agent, matched_on)) => {
                let latest = self
                    .store
                    .agents
                    .latest_version(agent.id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Agent version not found"))?;

                if latest.system_prompt.trim() == spec.system_prompt.trim() {
                    self.reuse_agent(agent, latest, &requested_slug, &effective_tags, matched_on)
                        .await
                } else {
                    self.append_version(agent, latest, spec, &requested_slug, &effective_tags, matched_on)
                        .await
                }
            }
        }
    }

    /// Ordered search: exact slug, case-insensitive name, tag intersection.
    async fn find_match(
        &self,
        slug: &str,
        spec: &AgentSpec,
        effective_tags: &[String],
    ) -> Result<Option<(Agent, &'static str)>, EngineError> {
        if let Some(agent) = self.store.agents.find_by_slug(slug).await? {
            return Ok(Some((agent, "slug")));
        }

        if let Some(agent) = self.store.agents.find_by_name(spec.name.trim()).await? {
            return Ok(Some((agent, "name")));
        }

        if !effective_tags.is_empty() {
            for agent in self.store.agents.list().await? {
                let tags = normalize_strings(&agent.metadata.tags);
                if tags.iter().any(|t| effective_tags.contains(t)) {
                    return Ok(Some((agent, "tags")));
                }
            }
        }

        Ok(None)
    }

    async fn create_agent(
        &self,
        spec: &AgentSpec,
        requested_slug: &str,
        effective_tags: &[String],
        origin: AgentOrigin,
    ) -> Result<AgentResolution, EngineError> {
        let metadata = self.build_metadata(spec, requested_slug, effective_tags, origin);

        let agent_id = AgentId::new();
        let mut version = AgentVersion::new(
            agent_id,
            1,
            spec.system_prompt.clone(),
            spec.routing_hints.clone().unwrap_or_default(),
            Actor::Agent,
        );
        version.resources = spec.resources.clone();
        version.io_schema = spec.io_schema.clone();

        let now = chrono::Utc::now();
        let agent = Agent {
            id: agent_id,
            slug: requested_slug.to_string(),
            name: spec.name.trim().to_string(),
            description: spec.description.clone().unwrap_or_default(),
            active_version_id: version.id,
            created_at: now,
            updated_at: now,
            created_by: Actor::Agent,
            metadata,
        };

        self.store.agents.insert(&agent).await?;
        self.store.agents.insert_version(&version).await?;
        info!(slug = %agent.slug, "agent created from plan");

        Ok(AgentResolution {
            requested_slug: requested_slug.to_string(),
            slug: agent.slug,
            agent_id,
            agent_version_id: version.id,
            reused: false,
            matched_on: None,
            created_new_agent: Some(true),
            created_new_version: None,
        })
    }

    async fn reuse_agent(
        &self,
        mut agent: Agent,
        latest: AgentVersion,
        requested_slug: &str,
        effective_tags: &[String],
        matched_on: &str,
    ) -> Result<AgentResolution, EngineError> {
        if self.merge_metadata(&mut agent.metadata, effective_tags) {
            agent.touch();
            self.store.agents.update(&agent).await?;
        }
        debug!(slug = %agent.slug, matched_on, "agent reused");

        Ok(AgentResolution {
            requested_slug: requested_slug.to_string(),
            slug: agent.slug,
            agent_id: agent.id,
            agent_version_id: latest.id,
            reused: true,
            matched_on: Some(matched_on.to_string()),
            created_new_agent: None,
            created_new_version: None,
        })
    }

    async fn append_version(
        &self,
        mut agent: Agent,
        latest: AgentVersion,
        spec: &AgentSpec,
        requested_slug: &str,
        effective_tags: &[String],
        matched_on: &str,
    ) -> Result<AgentResolution, EngineError> {
        let mut version = AgentVersion::new(
            agent.id,
            latest.version + 1,
            spec.system_prompt.clone(),
            spec.routing_hints.clone().unwrap_or_default(),
            Actor::Agent,
        );
        version.resources = spec.resources.clone();
        version.io_schema = spec.io_schema.clone();
        self.store.agents.insert_version(&version).await?;

        agent.active_version_id = version.id;
        self.merge_metadata(&mut agent.metadata, effective_tags);
        agent.touch();
        self.store.agents.update(&agent).await?;
        info!(slug = %agent.slug, version = version.version, "agent version appended from plan");

        Ok(AgentResolution {
            requested_slug: requested_slug.to_string(),
            slug: agent.slug,
            agent_id: agent.id,
            agent_version_id: version.id,
            reused: false,
            matched_on: Some(format!("{matched_on}-updated")),
            created_new_agent: None,
            created_new_version: Some(true),
        })
    }

    fn build_metadata(
        &self,
        spec: &AgentSpec,
        slug: &str,
        effective_tags: &[String],
        origin: AgentOrigin,
    ) -> AgentMetadata {
        // Explicit metadata wins; tag and label inference fill the gaps.
        let mut metadata: AgentMetadata = spec
            .metadata
            .as_ref()
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();

        metadata.tags = effective_tags.to_vec();
        if metadata.role.is_none() {
            metadata.role = infer_role_from_tags(effective_tags);
        }
        if metadata.domains.is_empty() {
            metadata.domains = extract_domains_from_tags(effective_tags);
        }
        if metadata.domains.is_empty() {
            if let Some(domain) = infer_domain_from_label(spec.name.trim(), slug) {
                metadata.domains.push(domain);
            }
        }
        metadata.origin = Some(origin);
        metadata.card = Some(synthesize_card(spec, slug, effective_tags));
        metadata
    }

    /// Merge newly observed tags into an agent's metadata. Returns whether
    /// anything changed.
    fn merge_metadata(&self, metadata: &mut AgentMetadata, effective_tags: &[String]) -> bool {
        let merged = merge_unique(&normalize_strings(&metadata.tags), effective_tags);
        let mut changed = merged != metadata.tags;
        metadata.tags = merged;

        if metadata.role.is_none() {
            if let Some(role) = infer_role_from_tags(&metadata.tags) {
                metadata.role = Some(role);
                changed = true;
            }
        }
        let new_domains = merge_unique(
            &metadata.domains,
            &extract_domains_from_tags(&metadata.tags),
        );
        if new_domains != metadata.domains {
            metadata.domains = new_domains;
            changed = true;
        }
        changed
    }
}

/// A2A-style card descriptor attached to every spawned agent and exposed at
/// /.well-known/agent-card.json.
fn synthesize_card(spec: &AgentSpec, slug: &str, effective_tags: &[String]) -> Value {
    json!({
        "protocolVersion": "0.3.0",
        "name": spec.name.trim(),
        "description": spec.description.clone().unwrap_or_default(),
        "skills": [{
            "id": slug,
            "name": spec.name.trim(),
            "tags": effective_tags,
        }],
    })
}
