#![allow(dead_code)]

//! Shared helpers for integration tests: in-memory store, scripted model
//! provider, and entity builders.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use arbor_core::application::executor::{ExecutorSettings, RunExecutor};
use arbor_core::domain::agent::{
    Actor, Agent, AgentMetadata, AgentVersion, RoutingHints,
};
use arbor_core::domain::llm::{ChatRequest, ChatResponse, ModelError, ModelProvider};
use arbor_core::domain::repository::Store;
use arbor_core::domain::run::{Run, RunId, RunInput, Session, SessionId};
use arbor_core::infrastructure::store::memory_store;

/// Provider that replays a fixed sequence of responses, one per call.
/// When the script is exhausted it answers with an empty final.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|v| v.to_string()).collect()),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn call(&self, _request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let next = self
            .responses
            .lock()
            .expect("scripted provider lock")
            .pop_front()
            .unwrap_or_else(|| r#"{"type":"final","result":null}"#.to_string());
        Ok(ChatResponse { content: next })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn store() -> Store {
    memory_store()
}

pub fn executor(store: &Store, provider: Arc<dyn ModelProvider>) -> Arc<RunExecutor> {
    Arc::new(RunExecutor::new(
        store.clone(),
        provider,
        ExecutorSettings::default(),
    ))
}

pub async fn create_session(store: &Store) -> SessionId {
    let session = Session::new(Some("test".to_string()));
    store.sessions.insert(&session).await.expect("insert session");
    session.id
}

/// Insert an agent with one version and return it.
pub async fn create_agent(
    store: &Store,
    slug: &str,
    name: &str,
    prompt: &str,
    metadata: AgentMetadata,
) -> Agent {
    let agent_id = arbor_core::domain::agent::AgentId::new();
    let version = AgentVersion::new(
        agent_id,
        1,
        prompt,
        RoutingHints::default(),
        Actor::System,
    );
    let now = chrono::Utc::now();
    let agent = Agent {
        id: agent_id,
        slug: slug.to_string(),
        name: name.to_string(),
        description: String::new(),
        active_version_id: version.id,
        created_at: now,
        updated_at: now,
        created_by: Actor::System,
        metadata,
    };
    store.agents.insert(&agent).await.expect("insert agent");
    store
        .agents
        .insert_version(&version)
        .await
        .expect("insert version");
    agent
}

/// Insert a root run bound to `agent` (or the bootstrap fallback when None).
pub async fn start_root_run(
    store: &Store,
    session_id: SessionId,
    agent: Option<&Agent>,
    user_message: &str,
    context: Option<Value>,
) -> RunId {
    let run = Run::new_root(
        session_id,
        agent.map(|a| a.id),
        agent.map(|a| a.active_version_id),
        RunInput {
            user_message: user_message.to_string(),
            context,
        },
    );
    store.runs.insert(&run).await.expect("insert run");
    run.id
}
