// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::agent::{AgentId, AgentVersionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversational grouping of runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

impl Session {
    pub fn new(title: Option<String>) -> Self {
        Self {
            id: SessionId::new(),
            title,
            created_at: Utc::now(),
            metadata: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "queued"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    pub user_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunError {
    pub message: String,
    pub last_event_seq: u64,
}

/// One execution of one agent version.
///
/// Lifecycle: created running, transitions exactly once to succeeded or
/// failed. `output` is set iff succeeded, `error` iff failed, `ended_at` iff
/// terminal. `root_run_id` equals the root of the parent chain (self when
/// there is no parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version_id: Option<AgentVersionId>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<RunId>,
    pub root_run_id: RunId,
    pub input: RunInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<RunOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Create a root run (no parent; `root_run_id` is self).
    pub fn new_root(
        session_id: SessionId,
        agent_id: Option<AgentId>,
        agent_version_id: Option<AgentVersionId>,
        input: RunInput,
    ) -> Self {
        let id = RunId::new();
        Self {
            id,
            session_id,
            agent_id,
            agent_version_id,
            status: RunStatus::Running,
            parent_run_id: None,
            root_run_id: id,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Create a child run under `parent`, inheriting the parent's root.
    pub fn new_child(
        parent: &Run,
        agent_id: Option<AgentId>,
        agent_version_id: Option<AgentVersionId>,
        input: RunInput,
    ) -> Self {
        Self {
            id: RunId::new(),
            session_id: parent.session_id,
            agent_id,
            agent_version_id,
            status: RunStatus::Running,
            parent_run_id: Some(parent.id),
            root_run_id: parent.root_run_id,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn succeed(&mut self, result: Value) {
        self.status = RunStatus::Succeeded;
        self.output = Some(RunOutput { result });
        self.error = None;
        self.ended_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>, last_event_seq: u64) {
        self.status = RunStatus::Failed;
        self.error = Some(RunError {
            message: message.into(),
            last_event_seq,
        });
        self.output = None;
        self.ended_at = Some(Utc::now());
    }
}
