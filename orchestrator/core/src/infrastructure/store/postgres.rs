// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Store
//!
//! Production repositories backed by PostgreSQL via `sqlx`. Each collection
//! is a table carrying the queryable columns plus the full entity document
//! as JSONB. The schema is applied by an idempotent migration at startup.
//!
//! Uniqueness invariants live in the schema: `agents.slug`,
//! `agent_versions (agent_id, version)`, and `events (run_id, seq)`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::agent::{Agent, AgentId, AgentVersion, AgentVersionId};
use crate::domain::event::RunEvent;
use crate::domain::repository::{
    AgentRepository, EventRepository, RunRepository, SessionRepository, StoreError,
    WorkflowRepository,
};
use crate::domain::run::{Run, RunId, Session, SessionId};
use crate::domain::workflow::{Workflow, WorkflowId};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes when absent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        const STATEMENTS: &[&str] = &[
            r#"
            CREATE TABLE IF NOT EXISTS agents (
                id UUID PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_agents_role ON agents ((doc->'metadata'->>'role'))",
            "CREATE INDEX IF NOT EXISTS idx_agents_domains ON agents USING GIN ((doc->'metadata'->'domains'))",
            "CREATE INDEX IF NOT EXISTS idx_agents_tags ON agents USING GIN ((doc->'metadata'->'tags'))",
            r#"
            CREATE TABLE IF NOT EXISTS agent_versions (
                id UUID PRIMARY KEY,
                agent_id UUID NOT NULL,
                version INT NOT NULL,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                UNIQUE (agent_id, version)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_agent_versions_agent ON agent_versions (agent_id, version DESC)",
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                doc JSONB NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id UUID PRIMARY KEY,
                session_id UUID NOT NULL,
                parent_run_id UUID,
                root_run_id UUID NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                doc JSONB NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_runs_session ON runs (session_id, started_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_runs_parent ON runs (parent_run_id)",
            "CREATE INDEX IF NOT EXISTS idx_runs_root ON runs (root_run_id)",
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id UUID PRIMARY KEY,
                run_id UUID NOT NULL,
                seq BIGINT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                doc JSONB NOT NULL,
                UNIQUE (run_id, seq)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_events_run_ts ON events (run_id, ts)",
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                doc JSONB NOT NULL
            )
            "#,
        ];

        for statement in STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(doc: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(StoreError::from)
}

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn insert(&self, agent: &Agent) -> Result<(), StoreError> {
        let doc = serde_json::to_value(agent)?;
        sqlx::query(
            r#"
            INSERT INTO agents (id, slug, name, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(agent.id.0)
        .bind(&agent.slug)
        .bind(&agent.name)
        .bind(doc)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, agent: &Agent) -> Result<(), StoreError> {
        let doc = serde_json::to_value(agent)?;
        let result = sqlx::query(
            r#"
            UPDATE agents
            SET slug = $2, name = $3, doc = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(agent.id.0)
        .bind(&agent.slug)
        .bind(&agent.name)
        .bind(doc)
        .bind(agent.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("agent {}", agent.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, StoreError> {
        let row = sqlx::query("SELECT doc FROM agents WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Agent>, StoreError> {
        let row = sqlx::query("SELECT doc FROM agents WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError> {
        let row = sqlx::query("SELECT doc FROM agents WHERE LOWER(name) = LOWER($1) LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn list(&self) -> Result<Vec<Agent>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM agents ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }

    async fn insert_version(&self, version: &AgentVersion) -> Result<(), StoreError> {
        let doc = serde_json::to_value(version)?;
        sqlx::query(
            r#"
            INSERT INTO agent_versions (id, agent_id, version, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(version.id.0)
        .bind(version.agent_id.0)
        .bind(version.version as i32)
        .bind(doc)
        .bind(version.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_version(&self, id: AgentVersionId) -> Result<Option<AgentVersion>, StoreError> {
        let row = sqlx::query("SELECT doc FROM agent_versions WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn list_versions(&self, agent_id: AgentId) -> Result<Vec<AgentVersion>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc FROM agent_versions WHERE agent_id = $1 ORDER BY version ASC",
        )
        .bind(agent_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }

    async fn latest_version(&self, agent_id: AgentId) -> Result<Option<AgentVersion>, StoreError> {
        let row = sqlx::query(
            "SELECT doc FROM agent_versions WHERE agent_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(agent_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }
}

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        let doc = serde_json::to_value(session)?;
        sqlx::query("INSERT INTO sessions (id, created_at, doc) VALUES ($1, $2, $3)")
            .bind(session.id.0)
            .bind(session.created_at)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT doc FROM sessions WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM sessions ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }
}

pub struct PostgresRunRepository {
    pool: PgPool,
}

impl PostgresRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for PostgresRunRepository {
    async fn insert(&self, run: &Run) -> Result<(), StoreError> {
        let doc = serde_json::to_value(run)?;
        sqlx::query(
            r#"
            INSERT INTO runs (id, session_id, parent_run_id, root_run_id, started_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id.0)
        .bind(run.session_id.0)
        .bind(run.parent_run_id.map(|p| p.0))
        .bind(run.root_run_id.0)
        .bind(run.started_at)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, run: &Run) -> Result<(), StoreError> {
        let doc = serde_json::to_value(run)?;
        let result = sqlx::query("UPDATE runs SET doc = $2 WHERE id = $1")
            .bind(run.id.0)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("run {}", run.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let row = sqlx::query("SELECT doc FROM runs WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Run>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc FROM runs WHERE session_id = $1 ORDER BY started_at DESC",
        )
        .bind(session_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }

    async fn count_by_root(&self, root_run_id: RunId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM runs WHERE root_run_id = $1")
            .bind(root_run_id.0)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.get("total");
        Ok(total as u64)
    }
}

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &RunEvent) -> Result<(), StoreError> {
        let doc = serde_json::to_value(event)?;
        sqlx::query(
            r#"
            INSERT INTO events (id, run_id, seq, ts, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id.0)
        .bind(event.run_id.0)
        .bind(event.seq as i64)
        .bind(event.ts)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn max_seq(&self, run_id: RunId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COALESCE(MAX(seq), 0) AS max_seq FROM events WHERE run_id = $1")
            .bind(run_id.0)
            .fetch_one(&self.pool)
            .await?;
        let max_seq: i64 = row.get("max_seq");
        Ok(max_seq as u64)
    }

    async fn list_for_run(
        &self,
        run_id: RunId,
        since_seq: u64,
    ) -> Result<Vec<RunEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc FROM events WHERE run_id = $1 AND seq > $2 ORDER BY seq ASC",
        )
        .bind(run_id.0)
        .bind(since_seq as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }
}

pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn upsert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let doc = serde_json::to_value(workflow)?;
        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, created_at, doc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                doc = EXCLUDED.doc
            "#,
        )
        .bind(workflow.id.0)
        .bind(&workflow.name)
        .bind(workflow.created_at)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let row = sqlx::query("SELECT doc FROM workflows WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get("doc"))).transpose()
    }

    async fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM workflows ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| decode(r.get("doc"))).collect()
    }
}
