//! Workflow runner behavior: linear evaluation, parent output propagation,
//! and abort on missing parent outputs.

mod common;

use serde_json::json;
use std::sync::Arc;

use arbor_core::application::workflow_runner::WorkflowRunner;
use arbor_core::domain::agent::AgentMetadata;
use arbor_core::domain::run::RunStatus;
use arbor_core::domain::workflow::{Workflow, WorkflowNode};

use common::{create_agent, create_session, executor, store, ScriptedProvider};

fn node(id: &str, slug: &str, include_user_prompt: bool, parents: &[&str]) -> WorkflowNode {
    WorkflowNode {
        id: id.to_string(),
        agent_slug: slug.to_string(),
        label: format!("{id} step"),
        include_user_prompt,
        parents: parents.iter().map(|p| p.to_string()).collect(),
    }
}

#[tokio::test]
async fn linear_workflow_passes_parent_outputs_forward() {
    let store = store();
    let session_id = create_session(&store).await;
    create_agent(&store, "writer", "Writer", "Write.", AgentMetadata::default()).await;
    create_agent(&store, "editor", "Editor", "Edit.", AgentMetadata::default()).await;

    let workflow = Workflow::new(
        "draft-then-polish",
        None,
        vec![
            node("draft", "writer", true, &[]),
            node("polish", "editor", false, &["draft"]),
        ],
    )
    .unwrap();
    store.workflows.upsert(&workflow).await.unwrap();

    let responses = vec![
        json!({ "type": "final", "result": { "draft": "rough text" } }),
        json!({ "type": "final", "result": { "polished": true } }),
    ];
    let executor = executor(&store, Arc::new(ScriptedProvider::new(responses)));
    let runner = WorkflowRunner::new(store.clone(), executor);

    let report = runner
        .run(workflow.id, session_id, "write about storks")
        .await
        .unwrap();

    assert_eq!(report.runs.len(), 2);
    assert!(report.runs.iter().all(|r| r.status == RunStatus::Succeeded));
    assert_eq!(report.final_output, Some(json!({ "polished": true })));

    // The polish node received the draft output and the continuation prompt.
    let polish_run = store
        .runs
        .find_by_id(report.runs[1].run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        polish_run.input.user_message,
        "Continue from previous agent output and produce the next step."
    );
    let context = polish_run.input.context.as_ref().unwrap();
    assert_eq!(context["parentOutputs"]["draft"], json!({ "draft": "rough text" }));
    assert_eq!(context["workflowUserMessage"], "write about storks");
    assert_eq!(context["nodeLabel"], "polish step");

    // The draft node carried the workflow's user message.
    let draft_run = store
        .runs
        .find_by_id(report.runs[0].run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft_run.input.user_message, "write about storks");
}

#[tokio::test]
async fn workflow_aborts_when_parent_output_missing() {
    let store = store();
    let session_id = create_session(&store).await;
    create_agent(&store, "writer", "Writer", "Write.", AgentMetadata::default()).await;
    create_agent(&store, "editor", "Editor", "Edit.", AgentMetadata::default()).await;

    let workflow = Workflow::new(
        "fragile",
        None,
        vec![
            node("draft", "writer", true, &[]),
            node("polish", "editor", false, &["draft"]),
        ],
    )
    .unwrap();
    store.workflows.upsert(&workflow).await.unwrap();

    // The draft run fails (bad response type), so its output never lands.
    let responses = vec![json!({ "type": "confused" })];
    let executor = executor(&store, Arc::new(ScriptedProvider::new(responses)));
    let runner = WorkflowRunner::new(store.clone(), executor);

    let err = runner
        .run(workflow.id, session_id, "write about storks")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Parent outputs missing");
}

#[tokio::test]
async fn workflow_run_requires_existing_workflow_and_session() {
    let store = store();
    let session_id = create_session(&store).await;
    let executor = executor(&store, Arc::new(ScriptedProvider::new(vec![])));
    let runner = WorkflowRunner::new(store.clone(), executor);

    let missing = arbor_core::domain::workflow::WorkflowId::new();
    let err = runner.run(missing, session_id, "go").await.unwrap_err();
    assert_eq!(err.to_string(), "Workflow not found");
}
