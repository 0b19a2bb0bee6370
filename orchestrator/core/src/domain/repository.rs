// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Repository Pattern - Storage Backend Abstraction
//
// Defines pluggable storage for the engine's collections, enabling:
// - In-memory storage for development/testing
// - PostgreSQL for production persistence
//
// One repository trait per aggregate root. Implementations live in
// infrastructure/store/.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::agent::{Agent, AgentId, AgentVersion, AgentVersionId};
use crate::domain::event::RunEvent;
use crate::domain::run::{Run, RunId, Session, SessionId};
use crate::domain::workflow::{Workflow, WorkflowId};

/// Storage backend selector for the repository factory.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    Postgres { connection_string: String },
}

/// Repository for Agent aggregates and their append-only version lists.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert a new agent. Fails with [`StoreError::Duplicate`] when the
    /// slug is taken.
    async fn insert(&self, agent: &Agent) -> Result<(), StoreError>;

    /// Update a mutable agent document (metadata, active version, name).
    async fn update(&self, agent: &Agent) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Agent>, StoreError>;

    /// Case-insensitive exact name match.
    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError>;

    async fn list(&self) -> Result<Vec<Agent>, StoreError>;

    /// Append a version. `(agent_id, version)` must be unique.
    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError>;

    async fn find_version(&self, id: AgentVersionId) -> Result<Option<AgentVersion>, StoreError>;

    /// Versions of one agent ordered by version number ascending.
    async fn list_versions(&self, agent_id: AgentId) -> Result<Vec<AgentVersion>, StoreError>;

    /// Highest-numbered version of one agent.
    async fn latest_version(&self, agent_id: AgentId) -> Result<Option<AgentVersion>, StoreError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Most recent sessions first.
    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn insert(&self, run: &Run) -> Result<(), StoreError>;

    async fn update(&self, run: &Run) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: RunId) -> Result<Option<Run>, StoreError>;

    /// Runs of one session, most recently started first.
    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Run>, StoreError>;

    /// Number of runs sharing a root (root included). Backs the spawn cap.
    async fn count_by_root(&self, root_run_id: RunId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a pre-sequenced event. `(run_id, seq)` must be unique.
    async fn insert(&self, event: &RunEvent) -> Result<(), StoreError>;

    /// Highest seq recorded for a run (0 when none).
    async fn max_seq(&self, run_id: RunId) -> Result<u64, StoreError>;

    /// Events with `seq > since_seq` in seq order.
    async fn list_for_run(&self, run_id: RunId, since_seq: u64) -> Result<Vec<RunEvent>, StoreError>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn upsert(&self, workflow: &Workflow) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    async fn list(&self) -> Result<Vec<Workflow>, StoreError>;
}

/// Bundle of repositories injected into the application services.
#[derive(Clone)]
pub struct Store {
    pub agents: Arc<dyn AgentRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub runs: Arc<dyn RunRepository>,
    pub events: Arc<dyn EventRepository>,
    pub workflows: Arc<dyn WorkflowRepository>,
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
