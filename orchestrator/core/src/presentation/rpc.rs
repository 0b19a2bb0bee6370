// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! JSON-RPC Method Dispatch
//!
//! Synchronous request/response dispatch keyed by method name. `run.start`
//! executes the run to completion before responding; there is no background
//! queue. Unknown methods map to -32601, handler failures to -32000.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::application::bootstrap::ensure_bootstrap_agent;
use crate::domain::agent::{Actor, AgentId, AgentVersion, AgentVersionId};
use crate::domain::error::EngineError;
use crate::domain::run::{Run, RunId, RunInput, Session, SessionId};
use crate::domain::workflow::{Workflow, WorkflowId, WorkflowNode};
use crate::presentation::http::AppState;

pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
pub const CODE_SERVER_ERROR: i64 = -32000;

const SESSION_LIST_DEFAULT: u64 = 50;
const SESSION_LIST_MAX: u64 = 200;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug)]
pub struct RpcFailure {
    pub code: i64,
    pub message: String,
}

impl From<EngineError> for RpcFailure {
    fn from(err: EngineError) -> Self {
        Self {
            code: CODE_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

/// Dispatch one method call against the engine.
pub async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value, RpcFailure> {
    let result = match method {
        "session.create" => session_create(state, params).await,
        "session.list" => session_list(state, params).await,
        "agent.list" => agent_list(state, params).await,
        "agent.get" => agent_get(state, params).await,
        "agent.version.get" => agent_version_get(state, params).await,
        "agent.updatePrompt" => agent_update_prompt(state, params).await,
        "agent.setActiveVersion" => agent_set_active_version(state, params).await,
        "run.start" => run_start(state, params).await,
        "run.get" => run_get(state, params).await,
        "run.events" => run_events(state, params).await,
        "run.tree" => run_tree(state, params).await,
        "workflow.save" => workflow_save(state, params).await,
        "workflow.list" => workflow_list(state, params).await,
        "workflow.get" => workflow_get(state, params).await,
        "workflow.run" => workflow_run(state, params).await,
        _ => {
            return Err(RpcFailure {
                code: CODE_METHOD_NOT_FOUND,
                message: format!("Method not found: {method}"),
            })
        }
    };
    result.map_err(RpcFailure::from)
}

fn parse_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Value,
) -> Result<T, EngineError> {
    let params = if params.is_null() {
        Value::Object(Map::new())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| EngineError::validation(format!("Invalid params for {method}: {e}")))
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Deserialize)]
struct SessionCreateParams {
    #[serde(default)]
    title: Option<String>,
}

async fn session_create(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: SessionCreateParams = parse_params("session.create", params)?;
    let session = Session::new(p.title);
    state.store.sessions.insert(&session).await?;
    Ok(json!({ "sessionId": session.id }))
}

#[derive(Deserialize)]
struct SessionListParams {
    #[serde(default)]
    limit: Option<u64>,
}

async fn session_list(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: SessionListParams = parse_params("session.list", params)?;
    let limit = p
        .limit
        .unwrap_or(SESSION_LIST_DEFAULT)
        .clamp(1, SESSION_LIST_MAX) as usize;
    let sessions = state.store.sessions.list(limit).await?;
    Ok(json!({ "sessions": sessions }))
}

// ============================================================================
// Agents
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentListParams {
    #[serde(default)]
    include_hidden: Option<bool>,
}

async fn agent_list(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: AgentListParams = parse_params("agent.list", params)?;
    let include_hidden = p.include_hidden.unwrap_or(false);
    let agents: Vec<_> = state
        .store
        .agents
        .list()
        .await?
        .into_iter()
        .filter(|a| include_hidden || !a.metadata.hidden)
        .collect();
    Ok(json!({ "agents": agents }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentGetParams {
    #[serde(default)]
    agent_id: Option<AgentId>,
    #[serde(default)]
    slug: Option<String>,
}

async fn agent_get(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: AgentGetParams = parse_params("agent.get", params)?;
    let agent = match (p.agent_id, p.slug) {
        (Some(id), _) => state.store.agents.find_by_id(id).await?,
        (None, Some(slug)) => state.store.agents.find_by_slug(&slug).await?,
        (None, None) => {
            return Err(EngineError::validation(
                "Missing required param: agentId or slug",
            ))
        }
    }
    .ok_or_else(|| EngineError::not_found("Agent not found"))?;

    let active_version = state
        .store
        .agents
        .find_version(agent.active_version_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Agent version not found"))?;
    let versions = state.store.agents.list_versions(agent.id).await?;

    Ok(json!({
        "agent": agent,
        "activeVersion": active_version,
        "versions": versions,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentVersionGetParams {
    version_id: AgentVersionId,
    #[serde(default)]
    agent_id: Option<AgentId>,
}

async fn agent_version_get(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: AgentVersionGetParams = parse_params("agent.version.get", params)?;
    let version = state
        .store
        .agents
        .find_version(p.version_id)
        .await?
        .filter(|v| p.agent_id.map(|id| v.agent_id == id).unwrap_or(true))
        .ok_or_else(|| EngineError::not_found("Agent version not found"))?;
    Ok(json!({ "version": version }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentUpdatePromptParams {
    agent_id: AgentId,
    new_system_prompt: String,
    #[serde(default)]
    editor: Option<String>,
}

async fn agent_update_prompt(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: AgentUpdatePromptParams = parse_params("agent.updatePrompt", params)?;
    if p.new_system_prompt.trim().is_empty() {
        return Err(EngineError::validation(
            "Missing required param: newSystemPrompt",
        ));
    }

    let mut agent = state
        .store
        .agents
        .find_by_id(p.agent_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Agent not found"))?;
    let latest = state
        .store
        .agents
        .latest_version(agent.id)
        .await?
        .ok_or_else(|| EngineError::not_found("Agent version not found"))?;

    let created_by = match p.editor.as_deref() {
        Some("agent") => Actor::Agent,
        Some("system") => Actor::System,
        _ => Actor::User,
    };
    let mut version = AgentVersion::new(
        agent.id,
        latest.version + 1,
        p.new_system_prompt,
        latest.routing_hints.clone(),
        created_by,
    );
    version.resources = latest.resources.clone();
    version.io_schema = latest.io_schema.clone();
    state.store.agents.insert_version(&version).await?;

    agent.active_version_id = version.id;
    agent.touch();
    state.store.agents.update(&agent).await?;

    Ok(json!({ "agentVersionId": version.id, "version": version.version }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentSetActiveVersionParams {
    agent_id: AgentId,
    version_id: AgentVersionId,
}

async fn agent_set_active_version(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: AgentSetActiveVersionParams = parse_params("agent.setActiveVersion", params)?;
    let mut agent = state
        .store
        .agents
        .find_by_id(p.agent_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Agent not found"))?;
    let version = state
        .store
        .agents
        .find_version(p.version_id)
        .await?
        .filter(|v| v.agent_id == agent.id)
        .ok_or_else(|| EngineError::not_found("Agent version not found"))?;

    agent.active_version_id = version.id;
    agent.touch();
    state.store.agents.update(&agent).await?;
    Ok(json!({ "activeVersionId": agent.active_version_id }))
}

// ============================================================================
// Runs
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunStartParams {
    session_id: SessionId,
    user_message: String,
    #[serde(default)]
    agent_slug: Option<String>,
    #[serde(default)]
    agent_id: Option<AgentId>,
    #[serde(default)]
    parent_run_id: Option<RunId>,
    #[serde(default)]
    context: Option<Value>,
}

async fn run_start(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: RunStartParams = parse_params("run.start", params)?;
    if p.user_message.trim().is_empty() {
        return Err(EngineError::validation(
            "Missing required param: userMessage",
        ));
    }
    state
        .store
        .sessions
        .find_by_id(p.session_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Session not found"))?;

    // agentId first, then slug; unresolvable references fall through to the
    // bootstrap agent.
    let mut agent = None;
    if let Some(id) = p.agent_id {
        agent = state.store.agents.find_by_id(id).await?;
    }
    if agent.is_none() {
        if let Some(slug) = &p.agent_slug {
            agent = state.store.agents.find_by_slug(slug).await?;
        }
    }
    let (agent_id, version_id) = match agent {
        Some(a) => (a.id, a.active_version_id),
        None => {
            let (a, v) = ensure_bootstrap_agent(&state.store).await?;
            (a.id, v.id)
        }
    };

    let input = RunInput {
        user_message: p.user_message,
        context: p.context,
    };
    let run = match p.parent_run_id {
        Some(parent_id) => {
            let parent = state
                .store
                .runs
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Run not found"))?;
            Run::new_child(&parent, Some(agent_id), Some(version_id), input)
        }
        None => Run::new_root(p.session_id, Some(agent_id), Some(version_id), input),
    };
    state.store.runs.insert(&run).await?;

    let finished = state.executor.execute(run.id).await?;
    Ok(json!({ "runId": finished.id }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunGetParams {
    run_id: RunId,
}

async fn run_get(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: RunGetParams = parse_params("run.get", params)?;
    let run = state
        .store
        .runs
        .find_by_id(p.run_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Run not found"))?;
    Ok(json!({ "run": run }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunEventsParams {
    run_id: RunId,
    #[serde(default)]
    since_seq: Option<u64>,
}

async fn run_events(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: RunEventsParams = parse_params("run.events", params)?;
    state
        .store
        .runs
        .find_by_id(p.run_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Run not found"))?;

    let since_seq = p.since_seq.unwrap_or(0);
    let events = state.store.events.list_for_run(p.run_id, since_seq).await?;
    let next_seq = events.last().map(|e| e.seq).unwrap_or(since_seq);
    Ok(json!({ "events": events, "nextSeq": next_seq }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunTreeParams {
    session_id: SessionId,
}

async fn run_tree(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: RunTreeParams = parse_params("run.tree", params)?;
    state
        .store
        .sessions
        .find_by_id(p.session_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Session not found"))?;

    let runs = state.store.runs.list_by_session(p.session_id).await?;
    let agents = state.store.agents.list().await?;

    let denormalized: Vec<Value> = runs
        .into_iter()
        .map(|run| {
            let agent = run
                .agent_id
                .and_then(|id| agents.iter().find(|a| a.id == id));
            let mut doc = serde_json::to_value(&run).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut doc {
                map.insert(
                    "agentSlug".to_string(),
                    agent.map(|a| json!(a.slug)).unwrap_or(Value::Null),
                );
                map.insert(
                    "agentName".to_string(),
                    agent.map(|a| json!(a.name)).unwrap_or(Value::Null),
                );
            }
            doc
        })
        .collect();

    Ok(json!({ "runs": denormalized }))
}

// ============================================================================
// Workflows
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowSaveParams {
    #[serde(default)]
    workflow_id: Option<WorkflowId>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    nodes: Vec<WorkflowNode>,
}

async fn workflow_save(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: WorkflowSaveParams = parse_params("workflow.save", params)?;
    let workflow = match p.workflow_id {
        Some(id) => {
            let mut workflow = state
                .store
                .workflows
                .find_by_id(id)
                .await?
                .ok_or_else(|| EngineError::not_found("Workflow not found"))?;
            workflow.update(p.name, p.description, p.nodes)?;
            workflow
        }
        None => Workflow::new(p.name, p.description, p.nodes)?,
    };
    state.store.workflows.upsert(&workflow).await?;
    Ok(json!({ "workflowId": workflow.id }))
}

async fn workflow_list(state: &AppState, _params: Value) -> Result<Value, EngineError> {
    let workflows = state.store.workflows.list().await?;
    Ok(json!({ "workflows": workflows }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowGetParams {
    workflow_id: WorkflowId,
}

async fn workflow_get(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: WorkflowGetParams = parse_params("workflow.get", params)?;
    let workflow = state
        .store
        .workflows
        .find_by_id(p.workflow_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Workflow not found"))?;
    Ok(json!({ "workflow": workflow }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowRunParams {
    workflow_id: WorkflowId,
    session_id: SessionId,
    user_message: String,
}

async fn workflow_run(state: &AppState, params: Value) -> Result<Value, EngineError> {
    let p: WorkflowRunParams = parse_params("workflow.run", params)?;
    let report = state
        .workflows
        .run(p.workflow_id, p.session_id, &p.user_message)
        .await?;
    Ok(json!({ "runs": report.runs, "finalOutput": report.final_output }))
}
