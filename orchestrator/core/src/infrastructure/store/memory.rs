// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::agent::{Agent, AgentId, AgentVersion, AgentVersionId};
use crate::domain::event::RunEvent;
use crate::domain::repository::{
    AgentRepository, EventRepository, RunRepository, SessionRepository, StoreError,
    WorkflowRepository,
};
use crate::domain::run::{Run, RunId, Session, SessionId};
use crate::domain::workflow::{Workflow, WorkflowId};

fn poisoned() -> StoreError {
    StoreError::Database("Mutex poisoned".to_string())
}

#[derive(Default)]
struct AgentState {
    agents: Vec<Agent>,
    versions: Vec<AgentVersion>,
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    state: Arc<Mutex<AgentState>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn insert(&self, agent: &Agent) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if state.agents.iter().any(|a| a.slug == agent.slug) {
            return Err(StoreError::Duplicate(format!("agents.slug: {}", agent.slug)));
        }
        state.agents.push(agent.clone());
        Ok(())
    }

    async fn update(&self, agent: &Agent) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        match state.agents.iter_mut().find(|a| a.id == agent.id) {
            Some(existing) => {
                *existing = agent.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("agent {}", agent.id))),
        }
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.agents.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Agent>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.agents.iter().find(|a| a.slug == slug).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let lowered = name.to_lowercase();
        Ok(state
            .agents
            .iter()
            .find(|a| a.name.to_lowercase() == lowered)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Agent>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.agents.clone())
    }

    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if state
            .versions
            .iter()
            .any(|v| v.agent_id == version.agent_id && v.version == version.version)
        {
            return Err(StoreError::Duplicate(format!(
                "agent_versions ({}, {})",
                version.agent_id, version.version
            )));
        }
        state.versions.push(version.clone());
        Ok(())
    }

    async fn find_version(&self, id: AgentVersionId) -> Result<Option<AgentVersion>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn list_versions(&self, agent_id: AgentId) -> Result<Vec<AgentVersion>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let mut versions: Vec<AgentVersion> = state
            .versions
            .iter()
            .filter(|v| v.agent_id == agent_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn latest_version(&self, agent_id: AgentId) -> Result<Option<AgentVersion>, StoreError> {
        Ok(self.list_versions(agent_id).await?.into_iter().last())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| poisoned())?;
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| poisoned())?;
        Ok(sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| poisoned())?;
        let mut all = sessions.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRunRepository {
    runs: Arc<Mutex<HashMap<RunId, Run>>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn insert(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        if runs.contains_key(&run.id) {
            return Err(StoreError::Duplicate(format!("runs.id: {}", run.id)));
        }
        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn update(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        match runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("run {}", run.id))),
        }
    }

    async fn find_by_id(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let runs = self.runs.lock().map_err(|_| poisoned())?;
        Ok(runs.get(&id).cloned())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Run>, StoreError> {
        let runs = self.runs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<Run> = runs
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matching)
    }

    async fn count_by_root(&self, root_run_id: RunId) -> Result<u64, StoreError> {
        let runs = self.runs.lock().map_err(|_| poisoned())?;
        Ok(runs.values().filter(|r| r.root_run_id == root_run_id).count() as u64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEventRepository {
    events: Arc<Mutex<HashMap<RunId, Vec<RunEvent>>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &RunEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock().map_err(|_| poisoned())?;
        let stream = events.entry(event.run_id).or_default();
        if stream.iter().any(|e| e.seq == event.seq) {
            return Err(StoreError::Duplicate(format!(
                "events ({}, {})",
                event.run_id, event.seq
            )));
        }
        stream.push(event.clone());
        Ok(())
    }

    async fn max_seq(&self, run_id: RunId) -> Result<u64, StoreError> {
        let events = self.events.lock().map_err(|_| poisoned())?;
        Ok(events
            .get(&run_id)
            .and_then(|stream| stream.iter().map(|e| e.seq).max())
            .unwrap_or(0))
    }

    async fn list_for_run(
        &self,
        run_id: RunId,
        since_seq: u64,
    ) -> Result<Vec<RunEvent>, StoreError> {
        let events = self.events.lock().map_err(|_| poisoned())?;
        let mut stream: Vec<RunEvent> = events
            .get(&run_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.seq > since_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        stream.sort_by_key(|e| e.seq);
        Ok(stream)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<Mutex<HashMap<WorkflowId, Workflow>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn upsert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.lock().map_err(|_| poisoned())?;
        workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let workflows = self.workflows.lock().map_err(|_| poisoned())?;
        Ok(workflows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.lock().map_err(|_| poisoned())?;
        let mut all: Vec<Workflow> = workflows.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
