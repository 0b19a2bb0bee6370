//! Agent resolver behavior: match ordering, reuse, version appends, and
//! provenance on spawned agents.

mod common;

use serde_json::json;

use arbor_core::application::resolver::{AgentResolver, AgentSpec};
use arbor_core::domain::agent::{AgentMetadata, AgentOrigin, AgentRole};
use arbor_core::domain::run::RunId;

use common::{create_agent, store};

fn origin() -> AgentOrigin {
    AgentOrigin {
        parent_run_id: Some(RunId::new()),
        root_run_id: Some(RunId::new()),
        created_by_agent_id: None,
        user_message: Some("spawn".to_string()),
    }
}

fn spec(slug: &str, name: &str, prompt: &str) -> AgentSpec {
    serde_json::from_value(json!({
        "slug": slug,
        "name": name,
        "systemPrompt": prompt,
    }))
    .unwrap()
}

#[tokio::test]
async fn unmatched_spec_creates_agent_with_provenance_and_card() {
    let store = store();
    let resolver = AgentResolver::new(store.clone());

    let spec: AgentSpec = serde_json::from_value(json!({
        "slug": "support-specialist",
        "name": "Support Specialist",
        "systemPrompt": "Help users.",
        "routingHints": { "tags": ["specialist", "domain:support"] },
    }))
    .unwrap();

    let resolution = resolver.resolve(&spec, origin()).await.unwrap();
    assert_eq!(resolution.slug, "support-specialist");
    assert_eq!(resolution.created_new_agent, Some(true));
    assert!(resolution.matched_on.is_none());
    assert!(!resolution.reused);

    let agent = store
        .agents
        .find_by_slug("support-specialist")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agent.metadata.role, Some(AgentRole::Specialist));
    assert_eq!(agent.metadata.domains, vec!["support"]);
    assert!(agent.metadata.origin.is_some());

    let card = agent.metadata.card.as_ref().unwrap();
    assert_eq!(card["skills"][0]["tags"], json!(["specialist", "domain:support"]));
    assert!(card["protocolVersion"].is_string());

    let versions = store.agents.list_versions(agent.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
}

#[tokio::test]
async fn name_match_is_case_insensitive() {
    let store = store();
    let resolver = AgentResolver::new(store.clone());
    let existing = create_agent(
        &store,
        "helper-one",
        "Helper One",
        "Assist.",
        AgentMetadata::default(),
    )
    .await;

    let resolution = resolver
        .resolve(&spec("brand-new-slug", "HELPER ONE", "Assist."), origin())
        .await
        .unwrap();

    assert_eq!(resolution.agent_id, existing.id);
    assert_eq!(resolution.matched_on.as_deref(), Some("name"));
    assert!(resolution.reused);
    assert_eq!(resolution.requested_slug, "brand-new-slug");
    assert_eq!(resolution.slug, "helper-one");
}

#[tokio::test]
async fn identical_trimmed_prompt_is_idempotent() {
    let store = store();
    let resolver = AgentResolver::new(store.clone());
    let existing = create_agent(
        &store,
        "echo",
        "Echo",
        "Repeat the message.",
        AgentMetadata::default(),
    )
    .await;

    for _ in 0..2 {
        let resolution = resolver
            .resolve(&spec("echo", "Echo", "  Repeat the message.  "), origin())
            .await
            .unwrap();
        assert!(resolution.reused);
        assert_eq!(resolution.matched_on.as_deref(), Some("slug"));
    }

    let versions = store.agents.list_versions(existing.id).await.unwrap();
    assert_eq!(versions.len(), 1);
}

#[tokio::test]
async fn changed_prompt_appends_contiguous_versions() {
    let store = store();
    let resolver = AgentResolver::new(store.clone());
    let existing = create_agent(
        &store,
        "echo",
        "Echo",
        "Repeat the message.",
        AgentMetadata::default(),
    )
    .await;

    for (i, prompt) in ["Second prompt.", "Third prompt."].iter().enumerate() {
        let resolution = resolver
            .resolve(&spec("echo", "Echo", prompt), origin())
            .await
            .unwrap();
        assert_eq!(resolution.matched_on.as_deref(), Some("slug-updated"));
        assert_eq!(resolution.created_new_version, Some(true));

        let versions = store.agents.list_versions(existing.id).await.unwrap();
        assert_eq!(versions.len(), i + 2);
        let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, (1..=(i as u32 + 2)).collect::<Vec<_>>());

        let agent = store.agents.find_by_id(existing.id).await.unwrap().unwrap();
        assert_eq!(agent.active_version_id, versions.last().unwrap().id);
    }
}

#[tokio::test]
async fn tag_intersection_matches_and_merges_tags() {
    let store = store();
    let resolver = AgentResolver::new(store.clone());
    let existing = create_agent(
        &store,
        "alpha-agent",
        "Alpha Agent",
        "Original.",
        AgentMetadata {
            tags: vec!["alpha".to_string()],
            ..Default::default()
        },
    )
    .await;

    let spec: AgentSpec = serde_json::from_value(json!({
        "slug": "fresh-slug",
        "name": "Fresh Name",
        "systemPrompt": "Original.",
        "metadata": { "tags": ["alpha", "beta"] },
    }))
    .unwrap();

    let resolution = resolver.resolve(&spec, origin()).await.unwrap();
    assert_eq!(resolution.agent_id, existing.id);
    assert_eq!(resolution.matched_on.as_deref(), Some("tags"));
    assert!(resolution.reused);

    let merged = store.agents.find_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(merged.metadata.tags, vec!["alpha", "beta"]);
}
