// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod error;
pub mod event;
pub mod llm;
pub mod repository;
pub mod routing;
pub mod run;
pub mod workflow;

pub use agent::{
    Actor, Agent, AgentId, AgentMetadata, AgentOrigin, AgentRole, AgentVersion, AgentVersionId,
    RoutingHints,
};
pub use error::EngineError;
pub use event::{EventId, EventType, RunEvent};
pub use llm::{ChatMessage, ChatRequest, ChatResponse, ModelError, ModelProvider};
pub use repository::{
    AgentRepository, EventRepository, RunRepository, SessionRepository, StorageBackend, Store,
    StoreError, WorkflowRepository,
};
pub use routing::{AgentIndexEntry, AgentSummary, RoutingState};
pub use run::{Run, RunError, RunId, RunInput, RunOutput, RunStatus, Session, SessionId};
pub use workflow::{Workflow, WorkflowError, WorkflowId, WorkflowNode};
