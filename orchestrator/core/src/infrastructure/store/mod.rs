// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use tracing::info;

use crate::domain::repository::{StorageBackend, Store, StoreError};

pub use memory::{
    InMemoryAgentRepository, InMemoryEventRepository, InMemoryRunRepository,
    InMemorySessionRepository, InMemoryWorkflowRepository,
};
pub use postgres::{
    Database, PostgresAgentRepository, PostgresEventRepository, PostgresRunRepository,
    PostgresSessionRepository, PostgresWorkflowRepository,
};

/// Construct the repository bundle for the selected backend, applying the
/// schema migration for PostgreSQL.
pub async fn create_store(backend: &StorageBackend) -> Result<Store, StoreError> {
    match backend {
        StorageBackend::InMemory => {
            info!("using in-memory store");
            Ok(memory_store())
        }
        StorageBackend::Postgres { connection_string } => {
            let db = Database::connect(connection_string).await?;
            db.migrate().await?;
            info!("using PostgreSQL store");
            let pool = db.pool().clone();
            Ok(Store {
                agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
                sessions: Arc::new(PostgresSessionRepository::new(pool.clone())),
                runs: Arc::new(PostgresRunRepository::new(pool.clone())),
                events: Arc::new(PostgresEventRepository::new(pool.clone())),
                workflows: Arc::new(PostgresWorkflowRepository::new(pool)),
            })
        }
    }
}

/// In-memory repository bundle, also used directly by tests.
pub fn memory_store() -> Store {
    Store {
        agents: Arc::new(InMemoryAgentRepository::new()),
        sessions: Arc::new(InMemorySessionRepository::new()),
        runs: Arc::new(InMemoryRunRepository::new()),
        events: Arc::new(InMemoryEventRepository::new()),
        workflows: Arc::new(InMemoryWorkflowRepository::new()),
    }
}
