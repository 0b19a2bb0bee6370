// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run Executor
//!
//! The recursive plan/final interpreter. One call to [`RunExecutor::execute`]
//! drives a run from RUN_STARTED to RUN_FINISHED: build context, call the
//! model, parse the response, enforce the routing policy, spawn or reuse
//! agents, execute child runs depth-first, and merge child outputs.
//!
//! Children execute strictly sequentially so `previousResults` is meaningful
//! and spawn-cap bookkeeping stays race-free. Failures are trapped once at
//! the run boundary; a parent observes a failed child through the stored run
//! document, never through control flow.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::bootstrap::ensure_bootstrap_agent;
use crate::application::events::EventLog;
use crate::application::resolver::{AgentResolution, AgentResolver, AgentSpec};
use crate::domain::agent::{Agent, AgentId, AgentOrigin, AgentRole, AgentVersion, AgentVersionId};
use crate::domain::error::EngineError;
use crate::domain::event::EventType;
use crate::domain::llm::{ChatMessage, ChatRequest, ModelError, ModelProvider};
use crate::domain::repository::Store;
use crate::domain::routing::{
    build_agent_summary, build_router_index, build_specialist_index, merge_unique,
    read_routing_state, summarize_agents, summarize_result,
};
use crate::domain::run::{Run, RunId, RunInput, RunStatus};

/// Upper bound on descendants per root run (root excluded).
pub const SPAWN_CAP: u64 = 10;

/// Sampling temperature for every plan/final request.
const MODEL_TEMPERATURE: f64 = 0.2;

/// Hex digits of the SHA-256 prompt digest recorded on MODEL_REQUEST.
const PROMPT_HASH_LEN: usize = 12;

/// Fixed policy suffix appended to every agent's system prompt.
const A2A_INSTRUCTION: &str = "\
You must reply with a single JSON object and nothing else. Reply either with \
{\"type\":\"final\",\"result\":...} to finish, or with {\"type\":\"plan\",\
\"agentsToCreate\":[...],\"runsToExecute\":[...]} to delegate. Delegation rules: \
never delegate to yourself; never delegate to a slug listed in \
routingState.visitedSlugs or to a sibling of the same plan; respect \
routingPolicy.maxDepth and routingPolicy.maxChildren; specialist agents may \
not create agents and may delegate to at most one router. Only the directory \
agent sees the full roster; everyone else works from the router and \
specialist indexes in the context.";

/// Routing limits injected into every context and enforced on every plan.
#[derive(Debug, Clone, Copy)]
pub struct RoutingPolicy {
    pub max_depth: u32,
    pub max_children: usize,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_children: 3,
        }
    }
}

/// Executor knobs derived from engine configuration.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub model_name: String,
    pub policy: RoutingPolicy,
    pub router_index_limit: usize,
    pub specialist_index_limit: usize,
    pub directory_slug: String,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            policy: RoutingPolicy::default(),
            router_index_limit: 50,
            specialist_index_limit: 50,
            directory_slug: "main-router".to_string(),
        }
    }
}

pub struct RunExecutor {
    store: Store,
    events: EventLog,
    model: Arc<dyn ModelProvider>,
    resolver: AgentResolver,
    settings: ExecutorSettings,
}

/// Validated plan ready for spawning.
struct PlanOutline {
    plan: Value,
    specs: Vec<AgentSpec>,
    child_entries: Vec<Value>,
    child_slugs: Vec<String>,
}

impl RunExecutor {
    pub fn new(
        store: Store,
        model: Arc<dyn ModelProvider>,
        settings: ExecutorSettings,
    ) -> Self {
        let events = EventLog::new(store.events.clone());
        let resolver = AgentResolver::new(store.clone());
        Self {
            store,
            events,
            model,
            resolver,
            settings,
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    /// Execute a run to completion and return its terminal document.
    ///
    /// Engine failures inside the run are trapped here: the run is marked
    /// failed, ERROR and RUN_FINISHED are appended, and the terminal run is
    /// returned as Ok. Only storage failures while recording the failure
    /// escape as Err.
    pub async fn execute(&self, run_id: RunId) -> Result<Run, EngineError> {
        let run = self
            .store
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Run not found"))?;

        match self.execute_inner(run).await {
            Ok(run) => Ok(run),
            Err(err) => self.fail_run(run_id, err).await,
        }
    }

    /// Boxed recursion point for child runs.
    fn execute_boxed<'a>(
        &'a self,
        run_id: RunId,
    ) -> Pin<Box<dyn Future<Output = Result<Run, EngineError>> + Send + 'a>> {
        Box::pin(self.execute(run_id))
    }

    async fn fail_run(&self, run_id: RunId, err: EngineError) -> Result<Run, EngineError> {
        let message = err.to_string();
        warn!(run_id = %run_id, error = %message, "run failed");

        let mut run = self
            .store
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Run not found"))?;

        let last_event_seq = self.events.last_seq(run_id).await?;
        run.fail(&message, last_event_seq);
        self.store.runs.update(&run).await?;

        self.events
            .emit(run_id, EventType::Error, json!({ "message": message }))
            .await?;
        self.events
            .emit(run_id, EventType::RunFinished, json!({ "status": "failed" }))
            .await?;

        Ok(run)
    }

    async fn execute_inner(&self, mut run: Run) -> Result<Run, EngineError> {
        self.events
            .emit(run.id, EventType::RunStarted, json!({}))
            .await?;

        let (agent, version) = self.resolve_agent_version(&run).await?;
        self.pin_agent(&mut run, &agent, &version).await?;

        self.events
            .emit(
                run.id,
                EventType::PromptLoaded,
                json!({
                    "agentVersionId": version.id,
                    "agentId": agent.id,
                    "slug": agent.slug,
                }),
            )
            .await?;

        let system_prompt = format!("{}\n{}", version.system_prompt, A2A_INSTRUCTION);

        let roster = self.store.agents.list().await?;
        let incoming = read_routing_state(run.input.context.as_ref());
        let visited = merge_unique(&incoming.visited_slugs, std::slice::from_ref(&agent.slug));
        let policy = self.read_routing_policy(run.input.context.as_ref());

        let context = self.build_context(
            &run,
            &agent,
            &roster,
            &visited,
            incoming.routing_depth,
            policy,
        );

        let model_name = version
            .routing_hints
            .preferred_model
            .clone()
            .unwrap_or_else(|| self.settings.model_name.clone());

        let prompt_hash = prompt_hash(&system_prompt, &run.input.user_message);
        self.events
            .emit(
                run.id,
                EventType::ModelRequest,
                json!({ "model": model_name, "promptHash": prompt_hash }),
            )
            .await?;

        let user_content = format!(
            "{}\n\nContext:\n{}",
            run.input.user_message,
            serde_json::to_string_pretty(&context).unwrap_or_else(|_| "{}".to_string()),
        );
        let request = ChatRequest {
            model: model_name,
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_content),
            ],
            temperature: MODEL_TEMPERATURE,
        };

        let response = self.model.call(&request).await?;
        let parsed: Value = serde_json::from_str(&response.content)
            .map_err(|e| ModelError::InvalidJson(e.to_string()))?;

        let response_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
        if response_type != "plan" && response_type != "final" {
            return Err(EngineError::validation(
                "Model response missing type plan/final",
            ));
        }

        self.events
            .emit(run.id, EventType::ModelResponse, parsed.clone())
            .await?;

        if response_type == "final" {
            let result = parsed.get("result").cloned().unwrap_or(Value::Null);
            run.succeed(result);
            self.store.runs.update(&run).await?;
            self.events
                .emit(run.id, EventType::RunFinished, json!({ "status": "succeeded" }))
                .await?;
            info!(run_id = %run.id, slug = %agent.slug, "run finished with final result");
            return Ok(run);
        }

        let outline = self
            .validate_plan(&run, &agent, &roster, parsed, &visited, incoming.routing_depth, policy)
            .await?;

        self.events
            .emit(
                run.id,
                EventType::SpawnAgentRequest,
                json!({
                    "agentsToCreate": outline.specs.iter().map(|s| s.slug.trim()).collect::<Vec<_>>(),
                    "runsToExecute": outline.child_slugs,
                }),
            )
            .await?;

        let resolutions = self.spawn_agents(&run, &agent, &outline.specs).await?;

        let (child_results, executed) = self
            .run_children(&run, &outline, &resolutions, &visited, incoming.routing_depth, policy)
            .await?;

        let merged = json!({
            "childResultsBySlug": child_results,
            "planSummary": {
                "createdAgents": resolutions.iter().map(|r| r.slug.clone()).collect::<Vec<_>>(),
                "executedAgents": executed,
            },
        });

        run.succeed(merged);
        self.store.runs.update(&run).await?;
        self.events
            .emit(run.id, EventType::RunFinished, json!({ "status": "succeeded" }))
            .await?;
        info!(run_id = %run.id, slug = %agent.slug, "run finished with merged plan result");
        Ok(run)
    }

    /// Resolve the agent and the version pinned for this run, falling back
    /// to the bootstrap agent when the run names none.
    async fn resolve_agent_version(
        &self,
        run: &Run,
    ) -> Result<(Agent, AgentVersion), EngineError> {
        match run.agent_id {
            Some(agent_id) => {
                let agent = self
                    .store
                    .agents
                    .find_by_id(agent_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Agent not found"))?;
                let version_id = run.agent_version_id.unwrap_or(agent.active_version_id);
                let version = self
                    .store
                    .agents
                    .find_version(version_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Agent version not found"))?;
                Ok((agent, version))
            }
            None => ensure_bootstrap_agent(&self.store).await,
        }
    }

    /// Persist the pinned agent/version on first resolution.
    async fn pin_agent(
        &self,
        run: &mut Run,
        agent: &Agent,
        version: &AgentVersion,
    ) -> Result<(), EngineError> {
        if run.agent_id.is_none() || run.agent_version_id.is_none() {
            run.agent_id = Some(agent.id);
            run.agent_version_id = Some(version.id);
            self.store.runs.update(run).await?;
        }
        Ok(())
    }

    fn read_routing_policy(&self, context: Option<&Value>) -> RoutingPolicy {
        let defaults = self.settings.policy;
        let policy = context.and_then(|c| c.get("routingPolicy"));
        RoutingPolicy {
            max_depth: policy
                .and_then(|p| p.get("maxDepth"))
                .and_then(|d| d.as_u64())
                .map(|d| d as u32)
                .unwrap_or(defaults.max_depth),
            max_children: policy
                .and_then(|p| p.get("maxChildren"))
                .and_then(|c| c.as_u64())
                .map(|c| c as usize)
                .unwrap_or(defaults.max_children),
        }
    }

    fn build_context(
        &self,
        run: &Run,
        agent: &Agent,
        roster: &[Agent],
        visited: &[String],
        routing_depth: u32,
        policy: RoutingPolicy,
    ) -> Value {
        let self_summary = build_agent_summary(agent);
        let mut context = Map::new();

        context.insert(
            "availableAgentsSummary".to_string(),
            summarize_agents(roster),
        );
        context.insert(
            "availableRouters".to_string(),
            serde_json::to_value(build_router_index(roster, self.settings.router_index_limit))
                .unwrap_or(Value::Null),
        );
        if self_summary.role == Some(AgentRole::Router) {
            // Cross-domain routers carry no domains and see the index
            // unfiltered.
            context.insert(
                "availableSpecialists".to_string(),
                serde_json::to_value(build_specialist_index(
                    roster,
                    self.settings.specialist_index_limit,
                    &self_summary.domains,
                ))
                .unwrap_or(Value::Null),
            );
        }
        context.insert(
            "routingPolicy".to_string(),
            json!({ "maxDepth": policy.max_depth, "maxChildren": policy.max_children }),
        );
        context.insert(
            "routingState".to_string(),
            json!({ "visitedSlugs": visited, "routingDepth": routing_depth }),
        );
        context.insert(
            "self".to_string(),
            serde_json::to_value(&self_summary).unwrap_or(Value::Null),
        );
        context.insert(
            "a2a".to_string(),
            json!({
                "directoryAgent": {
                    "slug": self.settings.directory_slug,
                    "purpose": "Agent directory and cross-domain router",
                },
            }),
        );
        if agent.slug == self.settings.directory_slug {
            let all: Vec<_> = roster.iter().map(build_agent_summary).collect();
            context.insert(
                "availableAgents".to_string(),
                serde_json::to_value(all).unwrap_or(Value::Null),
            );
        }

        // Forward the channel a parent run opened for us.
        if let Some(input_context) = run.input.context.as_ref() {
            for key in ["parentPlan", "previousResults", "explicitContext"] {
                if let Some(value) = input_context.get(key) {
                    context.insert(key.to_string(), value.clone());
                }
            }
        }

        Value::Object(context)
    }

    /// Normalize legacy plan keys and apply the policy checks in order.
    #[allow(clippy::too_many_arguments)]
    async fn validate_plan(
        &self,
        run: &Run,
        agent: &Agent,
        roster: &[Agent],
        plan: Value,
        visited: &[String],
        routing_depth: u32,
        policy: RoutingPolicy,
    ) -> Result<PlanOutline, EngineError> {
        let agents_to_create = plan_array(&plan, "agentsToCreate", "agents")?;
        let child_entries = plan_array(&plan, "runsToExecute", "runs")?;

        let raw_slugs: Vec<String> = child_entries
            .iter()
            .map(|e| {
                e.get("slug")
                    .and_then(|s| s.as_str())
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            })
            .collect();

        // 1. Role discipline.
        let self_role = build_agent_summary(agent).role;
        if self_role == Some(AgentRole::Specialist) {
            if !agents_to_create.is_empty() {
                return Err(EngineError::policy(
                    "Specialist agents cannot create new agents",
                ));
            }
            if child_entries.len() > 1 {
                return Err(EngineError::policy(
                    "Specialist agents may execute at most one child run",
                ));
            }
            for slug in &raw_slugs {
                let is_router = roster
                    .iter()
                    .find(|a| &a.slug == slug)
                    .map(|a| build_agent_summary(a).role == Some(AgentRole::Router))
                    .unwrap_or(false);
                if !is_router {
                    return Err(EngineError::policy(format!(
                        "Specialists may only delegate to router agents: {slug}"
                    )));
                }
            }
        }

        // 2. Depth limit.
        if routing_depth >= policy.max_depth && !child_entries.is_empty() {
            return Err(EngineError::policy("Routing depth exceeded"));
        }

        // 3. Fan-out limit.
        if child_entries.len() > policy.max_children {
            return Err(EngineError::policy("Too many child runs in plan"));
        }

        // 4. Per-run slug presence and uniqueness.
        let mut seen: Vec<&str> = Vec::new();
        for slug in &raw_slugs {
            if slug.is_empty() {
                return Err(EngineError::validation(
                    "Child run entries require a non-empty slug",
                ));
            }
            if seen.contains(&slug.as_str()) {
                return Err(EngineError::validation(format!(
                    "Duplicate child slug in plan: {slug}"
                )));
            }
            seen.push(slug);
        }

        // 5. Anti-loop.
        for slug in &raw_slugs {
            if visited.contains(slug) {
                return Err(EngineError::policy(format!(
                    "Slug already executed in this run tree: {slug}"
                )));
            }
        }

        // 6. Spawn cap.
        let total_in_tree = self.store.runs.count_by_root(run.root_run_id).await?;
        let already_spawned = total_in_tree.saturating_sub(1);
        if already_spawned + child_entries.len() as u64 > SPAWN_CAP {
            return Err(EngineError::policy("Spawn cap exceeded"));
        }

        // 7. Agent spec validity, before any insert.
        let mut specs = Vec::with_capacity(agents_to_create.len());
        for raw in &agents_to_create {
            let spec: AgentSpec = serde_json::from_value(raw.clone())
                .map_err(|e| EngineError::validation(format!("Invalid agent spec: {e}")))?;
            if spec.slug.trim().is_empty()
                || spec.name.trim().is_empty()
                || spec.system_prompt.trim().is_empty()
            {
                return Err(EngineError::validation(
                    "Agent specs require slug, name, and systemPrompt",
                ));
            }
            specs.push(spec);
        }

        debug!(
            run_id = %run.id,
            agents = specs.len(),
            children = child_entries.len(),
            "plan validated"
        );

        Ok(PlanOutline {
            plan,
            specs,
            child_entries,
            child_slugs: raw_slugs,
        })
    }

    async fn spawn_agents(
        &self,
        run: &Run,
        agent: &Agent,
        specs: &[AgentSpec],
    ) -> Result<Vec<AgentResolution>, EngineError> {
        let mut resolutions = Vec::with_capacity(specs.len());
        for spec in specs {
            let origin = AgentOrigin {
                parent_run_id: Some(run.id),
                root_run_id: Some(run.root_run_id),
                created_by_agent_id: Some(agent.id),
                user_message: Some(run.input.user_message.clone()),
            };
            let resolution = self.resolver.resolve(spec, origin).await?;
            self.events
                .emit(
                    run.id,
                    EventType::SpawnAgentCreated,
                    json!({ "resolution": resolution }),
                )
                .await?;
            resolutions.push(resolution);
        }
        Ok(resolutions)
    }

    /// Execute the plan's children sequentially, capturing failures as
    /// `{error}` results so siblings keep running.
    async fn run_children(
        &self,
        run: &Run,
        outline: &PlanOutline,
        resolutions: &[AgentResolution],
        visited: &[String],
        routing_depth: u32,
        policy: RoutingPolicy,
    ) -> Result<(Map<String, Value>, Vec<String>), EngineError> {
        let mut child_results = Map::new();
        let mut executed = Vec::new();

        // Children see the parent's visited set plus every sibling of the
        // plan, so cross-delegation between siblings is also a loop.
        let child_visited = merge_unique(visited, &outline.child_slugs);

        for (entry, slug) in outline.child_entries.iter().zip(&outline.child_slugs) {
            let previous: Map<String, Value> = child_results
                .iter()
                .map(|(k, v)| (k.clone(), summarize_result(v)))
                .collect();

            let child_context = json!({
                "parentPlan": outline.plan,
                "previousResults": previous,
                "explicitContext": entry.get("context").cloned().unwrap_or(Value::Null),
                "routingPolicy": {
                    "maxDepth": policy.max_depth,
                    "maxChildren": policy.max_children,
                },
                "routingState": {
                    "visitedSlugs": child_visited,
                    "routingDepth": routing_depth + 1,
                },
            });

            let user_message = entry
                .get("userMessage")
                .and_then(|m| m.as_str())
                .unwrap_or(&run.input.user_message)
                .to_string();

            let (agent_id, version_id) = self.child_agent(resolutions, slug).await?;
            let child = Run::new_child(
                run,
                Some(agent_id),
                Some(version_id),
                RunInput {
                    user_message,
                    context: Some(child_context),
                },
            );
            self.store.runs.insert(&child).await?;

            self.events
                .emit(
                    run.id,
                    EventType::ChildRunStarted,
                    json!({ "childRunId": child.id, "slug": slug }),
                )
                .await?;

            let finished = self.execute_boxed(child.id).await?;
            let result = match finished.status {
                RunStatus::Succeeded => finished
                    .output
                    .map(|o| o.result)
                    .unwrap_or(Value::Null),
                _ => json!({
                    "error": finished
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "Run failed".to_string()),
                }),
            };
            child_results.insert(slug.clone(), result);
            executed.push(slug.clone());

            self.events
                .emit(
                    run.id,
                    EventType::ChildRunFinished,
                    json!({ "childRunId": child.id, "status": finished.status }),
                )
                .await?;
        }

        Ok((child_results, executed))
    }

    /// Pick the agent for a child entry: plan resolution first, then the
    /// existing roster, then the bootstrap agent.
    async fn child_agent(
        &self,
        resolutions: &[AgentResolution],
        slug: &str,
    ) -> Result<(AgentId, AgentVersionId), EngineError> {
        if let Some(resolution) = resolutions.iter().find(|r| r.requested_slug == slug) {
            return Ok((resolution.agent_id, resolution.agent_version_id));
        }
        if let Some(agent) = self.store.agents.find_by_slug(slug).await? {
            return Ok((agent.id, agent.active_version_id));
        }
        let (agent, version) = ensure_bootstrap_agent(&self.store).await?;
        Ok((agent.id, version.id))
    }
}

/// First 12 hex characters of SHA-256 over the composed prompt.
fn prompt_hash(system_prompt: &str, user_message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system_prompt.as_bytes());
    hasher.update(user_message.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..PROMPT_HASH_LEN].to_string()
}

/// Read a plan array under its canonical key, falling back to the legacy
/// alias models still emit. A present non-array value is a hard error.
fn plan_array(plan: &Value, key: &str, legacy: &str) -> Result<Vec<Value>, EngineError> {
    let value = plan.get(key).or_else(|| plan.get(legacy));
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(EngineError::validation(format!(
            "Plan {key} must be an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_hash_is_stable_12_hex() {
        let a = prompt_hash("system", "user");
        let b = prompt_hash("system", "user");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, prompt_hash("system", "other"));
    }

    #[test]
    fn plan_array_accepts_legacy_alias() {
        let plan = json!({ "agents": [{ "slug": "x" }] });
        let items = plan_array(&plan, "agentsToCreate", "agents").unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn plan_array_rejects_non_array() {
        let plan = json!({ "runsToExecute": "nope" });
        assert!(plan_array(&plan, "runsToExecute", "runs").is_err());
    }

    #[test]
    fn plan_array_defaults_to_empty() {
        let plan = json!({ "type": "plan" });
        assert!(plan_array(&plan, "agentsToCreate", "agents").unwrap().is_empty());
    }
}
