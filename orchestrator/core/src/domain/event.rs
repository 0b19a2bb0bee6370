// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::run::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Event types recorded on the per-run stream. RUN_STARTED is always first
/// and RUN_FINISHED always last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunStarted,
    PromptLoaded,
    ModelRequest,
    ModelResponse,
    SpawnAgentRequest,
    SpawnAgentCreated,
    ChildRunStarted,
    ChildRunFinished,
    RunFinished,
    Error,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::RunStarted => "RUN_STARTED",
            EventType::PromptLoaded => "PROMPT_LOADED",
            EventType::ModelRequest => "MODEL_REQUEST",
            EventType::ModelResponse => "MODEL_RESPONSE",
            EventType::SpawnAgentRequest => "SPAWN_AGENT_REQUEST",
            EventType::SpawnAgentCreated => "SPAWN_AGENT_CREATED",
            EventType::ChildRunStarted => "CHILD_RUN_STARTED",
            EventType::ChildRunFinished => "CHILD_RUN_FINISHED",
            EventType::RunFinished => "RUN_FINISHED",
            EventType::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Append-only event on a run's stream. `seq` is 1-based, gapless, and
/// unique per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub id: EventId,
    pub run_id: RunId,
    pub seq: u64,
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: Value,
}

impl RunEvent {
    pub fn new(run_id: RunId, seq: u64, event_type: EventType, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            run_id,
            seq,
            ts: Utc::now(),
            event_type,
            payload,
        }
    }
}
