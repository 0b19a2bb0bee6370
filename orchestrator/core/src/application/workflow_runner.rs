// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Runner
//!
//! Linear evaluator over a saved DAG. Nodes run in persisted order; every
//! declared parent must already have a completed output or the whole
//! workflow aborts. No implicit topological sort.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::application::bootstrap::ensure_bootstrap_agent;
use crate::application::executor::RunExecutor;
use crate::domain::error::EngineError;
use crate::domain::repository::Store;
use crate::domain::run::{Run, RunId, RunInput, RunStatus, SessionId};
use crate::domain::workflow::WorkflowId;

/// Prompt used for nodes that do not include the workflow's user message.
const CONTINUE_PROMPT: &str =
    "Continue from previous agent output and produce the next step.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNodeRun {
    pub node_id: String,
    pub agent_slug: String,
    pub run_id: RunId,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunReport {
    pub runs: Vec<WorkflowNodeRun>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
}

#[derive(Clone)]
pub struct WorkflowRunner {
    store: Store,
    executor: Arc<RunExecutor>,
}

impl WorkflowRunner {
    pub fn new(store: Store, executor: Arc<RunExecutor>) -> Self {
        Self { store, executor }
    }

    pub async fn run(
        &self,
        workflow_id: WorkflowId,
        session_id: SessionId,
        user_message: &str,
    ) -> Result<WorkflowRunReport, EngineError> {
        let workflow = self
            .store
            .workflows
            .find_by_id(workflow_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Workflow not found"))?;
        self.store
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Session not found"))?;

        info!(workflow = %workflow.name, nodes = workflow.nodes.len(), "workflow run started");

        let mut completed: HashMap<String, Value> = HashMap::new();
        let mut node_runs: Vec<WorkflowNodeRun> = Vec::with_capacity(workflow.nodes.len());

        for node in &workflow.nodes {
            let mut parent_outputs = Map::new();
            for parent in &node.parents {
                match completed.get(parent) {
                    Some(output) => {
                        parent_outputs.insert(parent.clone(), output.clone());
                    }
                    None => return Err(EngineError::validation("Parent outputs missing")),
                }
            }

            let context = json!({
                "parentOutputs": parent_outputs,
                "workflowUserMessage": user_message,
                "nodeLabel": node.label,
            });
            let node_message = if node.include_user_prompt {
                user_message.to_string()
            } else {
                CONTINUE_PROMPT.to_string()
            };

            let (agent_id, version_id) = match self.store.agents.find_by_slug(&node.agent_slug).await? {
                Some(agent) => (agent.id, agent.active_version_id),
                None => {
                    let (agent, version) = ensure_bootstrap_agent(&self.store).await?;
                    (agent.id, version.id)
                }
            };

            let run = Run::new_root(
                session_id,
                Some(agent_id),
                Some(version_id),
                RunInput {
                    user_message: node_message,
                    context: Some(context),
                },
            );
            self.store.runs.insert(&run).await?;

            let finished = self.executor.execute(run.id).await?;
            let output = finished.output.as_ref().map(|o| o.result.clone());
            if let (RunStatus::Succeeded, Some(result)) = (finished.status, output.clone()) {
                completed.insert(node.id.clone(), result);
            }

            node_runs.push(WorkflowNodeRun {
                node_id: node.id.clone(),
                agent_slug: node.agent_slug.clone(),
                run_id: finished.id,
                status: finished.status,
                output,
            });
        }

        let final_output = node_runs.last().and_then(|r| r.output.clone());
        Ok(WorkflowRunReport {
            runs: node_runs,
            final_output,
        })
    }
}
