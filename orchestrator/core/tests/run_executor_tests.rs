//! End-to-end run executor scenarios against the in-memory store and the
//! offline mock provider.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;

use arbor_core::application::bootstrap::ensure_bootstrap_agent;
use arbor_core::domain::agent::AgentMetadata;
use arbor_core::domain::event::EventType;
use arbor_core::domain::run::{Run, RunInput, RunStatus};
use arbor_core::infrastructure::llm::mock::MockProvider;

use common::{create_agent, create_session, executor, start_root_run, store, ScriptedProvider};

/// Scenario 1: a final-only response stores the result verbatim and leaves
/// exactly five events.
#[tokio::test]
async fn final_only_run_succeeds_with_five_events() {
    let store = store();
    let executor = executor(&store, Arc::new(MockProvider::new()));
    let session_id = create_session(&store).await;
    let agent = create_agent(
        &store,
        "demo-echo",
        "Demo Echo",
        "Echo the user message.",
        AgentMetadata::default(),
    )
    .await;

    let run_id = start_root_run(&store, session_id, Some(&agent), "final only: hi", None).await;
    let run = executor.execute(run_id).await.expect("execute");

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(
        run.output.as_ref().map(|o| &o.result),
        Some(&json!({ "mock": true, "echo": "final only: hi" }))
    );
    assert!(run.ended_at.is_some());
    assert!(run.error.is_none());

    let events = store.events.list_for_run(run_id, 0).await.unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::RunStarted,
            EventType::PromptLoaded,
            EventType::ModelRequest,
            EventType::ModelResponse,
            EventType::RunFinished,
        ]
    );
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert_eq!(events[4].payload, json!({ "status": "succeeded" }));
}

/// Scenario 2: the mock plan creates `mock-echo`, runs it as a child, and
/// merges the child result.
#[tokio::test]
async fn plan_creates_and_runs_child_agent() {
    let store = store();
    let executor = executor(&store, Arc::new(MockProvider::new()));
    let session_id = create_session(&store).await;

    let run_id = start_root_run(&store, session_id, None, "Plan a demo", None).await;
    let run = executor.execute(run_id).await.expect("execute");

    assert_eq!(run.status, RunStatus::Succeeded);

    let created = store
        .agents
        .find_by_slug("mock-echo")
        .await
        .unwrap()
        .expect("mock-echo created");
    let versions = store.agents.list_versions(created.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
    assert!(created.metadata.origin.is_some());
    assert!(created.metadata.card.is_some());

    let runs = store.runs.list_by_session(session_id).await.unwrap();
    let children: Vec<&Run> = runs.iter().filter(|r| r.parent_run_id.is_some()).collect();
    assert_eq!(children.len(), 1);
    let child = children[0];
    assert_eq!(child.parent_run_id, Some(run_id));
    assert_eq!(child.root_run_id, run_id);
    assert_eq!(child.status, RunStatus::Succeeded);

    // Child observes depth parent + 1 and never its own slug missing from
    // the parent's pre-plan visited set.
    let child_context = child.input.context.as_ref().unwrap();
    assert_eq!(child_context["routingState"]["routingDepth"], 1);
    let visited: Vec<&str> = child_context["routingState"]["visitedSlugs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(visited.contains(&"bootstrap"));
    assert!(visited.contains(&"mock-echo"));

    let result = &run.output.as_ref().unwrap().result;
    assert_eq!(
        result["childResultsBySlug"]["mock-echo"],
        child.output.as_ref().unwrap().result
    );
    assert_eq!(result["planSummary"]["createdAgents"], json!(["mock-echo"]));
    assert_eq!(result["planSummary"]["executedAgents"], json!(["mock-echo"]));
}

/// Scenario 3: re-running the identical plan reuses the agent by slug and
/// appends no version.
#[tokio::test]
async fn identical_plan_reuses_agent_without_new_version() {
    let store = store();
    let executor = executor(&store, Arc::new(MockProvider::new()));
    let session_id = create_session(&store).await;

    let first = start_root_run(&store, session_id, None, "Plan a demo", None).await;
    executor.execute(first).await.expect("first execute");

    let second = start_root_run(&store, session_id, None, "Plan a demo", None).await;
    executor.execute(second).await.expect("second execute");

    let agent = store
        .agents
        .find_by_slug("mock-echo")
        .await
        .unwrap()
        .expect("mock-echo");
    let versions = store.agents.list_versions(agent.id).await.unwrap();
    assert_eq!(versions.len(), 1, "identical prompt must not append a version");

    let events = store.events.list_for_run(second, 0).await.unwrap();
    let spawn_created: Vec<&Value> = events
        .iter()
        .filter(|e| e.event_type == EventType::SpawnAgentCreated)
        .map(|e| &e.payload)
        .collect();
    assert_eq!(spawn_created.len(), 1);
    assert_eq!(spawn_created[0]["resolution"]["matchedOn"], "slug");
    assert_eq!(spawn_created[0]["resolution"]["reused"], true);
}

/// Scenario 4: a new slug whose tags intersect an existing agent's tags
/// matches on tags; a differing prompt appends a version.
#[tokio::test]
async fn tag_match_appends_version_on_prompt_change() {
    let store = store();
    let session_id = create_session(&store).await;
    let existing = create_agent(
        &store,
        "alpha-helper",
        "Alpha Helper",
        "Original alpha prompt.",
        AgentMetadata {
            tags: vec!["alpha".to_string()],
            ..Default::default()
        },
    )
    .await;

    let plan = json!({
        "type": "plan",
        "agentsToCreate": [{
            "slug": "x-helper",
            "name": "X Helper",
            "systemPrompt": "A different prompt.",
            "metadata": { "tags": ["alpha"] },
        }],
        "runsToExecute": [],
    });
    let provider = Arc::new(ScriptedProvider::new(vec![plan]));
    let executor = executor(&store, provider);

    let run_id = start_root_run(&store, session_id, None, "make a helper", None).await;
    let run = executor.execute(run_id).await.expect("execute");
    assert_eq!(run.status, RunStatus::Succeeded);

    assert!(
        store.agents.find_by_slug("x-helper").await.unwrap().is_none(),
        "tag match must not create a new agent"
    );
    let versions = store.agents.list_versions(existing.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].version, 2);
    assert_eq!(versions[1].system_prompt, "A different prompt.");

    let updated = store.agents.find_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(updated.active_version_id, versions[1].id);

    let events = store.events.list_for_run(run_id, 0).await.unwrap();
    let resolution = events
        .iter()
        .find(|e| e.event_type == EventType::SpawnAgentCreated)
        .map(|e| &e.payload["resolution"])
        .expect("resolution event");
    assert_eq!(resolution["matchedOn"], "tags-updated");
    assert_eq!(resolution["createdNewVersion"], true);
}

/// Scenario 5: a root already owning ten descendants rejects one more.
#[tokio::test]
async fn spawn_cap_rejects_eleventh_descendant() {
    let store = store();
    let session_id = create_session(&store).await;
    let (bootstrap, bootstrap_version) = ensure_bootstrap_agent(&store).await.unwrap();

    let root_id = start_root_run(&store, session_id, None, "one more child", None).await;
    let root = store.runs.find_by_id(root_id).await.unwrap().unwrap();
    for i in 0..10 {
        let mut child = Run::new_child(
            &root,
            Some(bootstrap.id),
            Some(bootstrap_version.id),
            RunInput {
                user_message: format!("descendant {i}"),
                context: None,
            },
        );
        child.succeed(json!(null));
        store.runs.insert(&child).await.unwrap();
    }

    let plan = json!({
        "type": "plan",
        "agentsToCreate": [],
        "runsToExecute": [{ "slug": "anyone" }],
    });
    let executor = executor(&store, Arc::new(ScriptedProvider::new(vec![plan])));

    let run = executor.execute(root_id).await.expect("execute");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error.as_ref().unwrap().message, "Spawn cap exceeded");

    let total = store.runs.count_by_root(root_id).await.unwrap();
    assert_eq!(total, 11, "cap holds at one root plus ten descendants");
}

/// Scenario 6: delegating to a slug already visited fails with a single
/// ERROR event immediately before RUN_FINISHED.
#[tokio::test]
async fn anti_loop_rejects_visited_slug() {
    let store = store();
    let session_id = create_session(&store).await;

    let plan = json!({
        "type": "plan",
        "agentsToCreate": [],
        "runsToExecute": [{ "slug": "a" }],
    });
    let executor = executor(&store, Arc::new(ScriptedProvider::new(vec![plan])));

    let context = json!({ "routingState": { "visitedSlugs": ["a"], "routingDepth": 0 } });
    let run_id = start_root_run(&store, session_id, None, "loop please", Some(context)).await;
    let run = executor.execute(run_id).await.expect("execute");

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.error.as_ref().unwrap().message,
        "Slug already executed in this run tree: a"
    );

    let events = store.events.list_for_run(run_id, 0).await.unwrap();
    let error_events: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.event_type == EventType::Error)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(error_events.len(), 1);
    assert_eq!(error_events[0], events.len() - 2);
    assert_eq!(events.last().unwrap().event_type, EventType::RunFinished);
    assert_eq!(events.last().unwrap().payload, json!({ "status": "failed" }));

    // error.lastEventSeq points at the last event before ERROR.
    let error_seq = events[error_events[0]].seq;
    assert_eq!(run.error.as_ref().unwrap().last_event_seq, error_seq - 1);
}

/// Event streams always open with RUN_STARTED and close with RUN_FINISHED,
/// gaplessly, for every run in a tree.
#[tokio::test]
async fn event_streams_are_gapless_and_framed() {
    let store = store();
    let executor = executor(&store, Arc::new(MockProvider::new()));
    let session_id = create_session(&store).await;

    let run_id = start_root_run(&store, session_id, None, "Plan a demo", None).await;
    executor.execute(run_id).await.expect("execute");

    for run in store.runs.list_by_session(session_id).await.unwrap() {
        let events = store.events.list_for_run(run.id, 0).await.unwrap();
        assert!(!events.is_empty());
        assert_eq!(events.first().unwrap().event_type, EventType::RunStarted);
        assert_eq!(events.last().unwrap().event_type, EventType::RunFinished);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.seq, i as u64 + 1, "seq gap in run {}", run.id);
        }
        assert!(run.ended_at.is_some());
        assert!(run.output.is_some() ^ run.error.is_some());
    }
}
