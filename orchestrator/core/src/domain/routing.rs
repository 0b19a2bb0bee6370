// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Routing Utilities
//!
//! Pure functions (no I/O) used by the run executor to derive agent
//! summaries, build the router/specialist indexes handed to models, parse
//! routing state out of run context, and bound result payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::domain::agent::{Agent, AgentRole};

/// Maximum string length preserved by [`summarize_result`], ellipsis included.
const SUMMARY_STRING_LIMIT: usize = 200;

/// Maximum object keys preserved by [`summarize_result`].
const SUMMARY_KEY_LIMIT: usize = 20;

/// Number of tags reported by [`summarize_agents`].
const TOP_TAG_LIMIT: usize = 12;

/// Drop empty items and surrounding whitespace, preserving order.
pub fn normalize_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|v| {
            let trimmed = v.as_ref().trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Stable-order deduplicated union of two string sequences.
pub fn merge_unique(a: &[String], b: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(a.len() + b.len());
    for item in a.iter().chain(b.iter()) {
        if !out.iter().any(|existing| existing == item) {
            out.push(item.clone());
        }
    }
    out
}

/// Infer a routing role from tags. Router precedence beats specialist when
/// both are present.
pub fn infer_role_from_tags(tags: &[String]) -> Option<AgentRole> {
    if tags.iter().any(|t| t == "router" || t == "domain-router") {
        return Some(AgentRole::Router);
    }
    if tags.iter().any(|t| t == "specialist") {
        return Some(AgentRole::Specialist);
    }
    None
}

/// Collect the normalized suffixes of every `domain:` tag.
pub fn extract_domains_from_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|t| t.strip_prefix("domain:"))
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Derive a domain from an agent's slug or name by stripping role suffixes.
pub fn infer_domain_from_label(name: &str, slug: &str) -> Option<String> {
    const SLUG_SUFFIXES: [&str; 4] = ["_router", "-router", "_specialist", "-specialist"];
    const NAME_SUFFIXES: [&str; 2] = [" router", " specialist"];

    for suffix in SLUG_SUFFIXES {
        if let Some(stripped) = slug.strip_suffix(suffix) {
            let domain = stripped.trim().to_lowercase();
            if !domain.is_empty() {
                return Some(domain);
            }
        }
    }
    let lowered = name.to_lowercase();
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = lowered.strip_suffix(suffix) {
            let domain = stripped.trim().to_string();
            if !domain.is_empty() {
                return Some(domain);
            }
        }
    }
    None
}

/// Routing-relevant projection of an agent. Metadata wins; tag and label
/// inference fill the gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub domains: Vec<String>,
    pub capabilities: Vec<String>,
    pub role: Option<AgentRole>,
    pub system: bool,
    pub hidden: bool,
}

pub fn build_agent_summary(agent: &Agent) -> AgentSummary {
    let tags = normalize_strings(&agent.metadata.tags);

    let role = agent.metadata.role.or_else(|| infer_role_from_tags(&tags));

    let mut domains = normalize_strings(&agent.metadata.domains);
    if domains.is_empty() {
        domains = extract_domains_from_tags(&tags);
    }
    if domains.is_empty() {
        if let Some(domain) = infer_domain_from_label(&agent.name, &agent.slug) {
            domains.push(domain);
        }
    }

    AgentSummary {
        slug: agent.slug.clone(),
        name: agent.name.clone(),
        description: agent.description.clone(),
        tags,
        domains,
        capabilities: normalize_strings(&agent.metadata.capabilities),
        role,
        system: agent.metadata.system,
        hidden: agent.metadata.hidden,
    }
}

/// Projection handed to models in the router/specialist indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIndexEntry {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub domains: Vec<String>,
    pub tags: Vec<String>,
}

impl From<AgentSummary> for AgentIndexEntry {
    fn from(summary: AgentSummary) -> Self {
        Self {
            slug: summary.slug,
            name: summary.name,
            description: summary.description,
            domains: summary.domains,
            tags: summary.tags,
        }
    }
}

/// First `limit` visible router agents.
pub fn build_router_index(agents: &[Agent], limit: usize) -> Vec<AgentIndexEntry> {
    agents
        .iter()
        .map(build_agent_summary)
        .filter(|s| s.role == Some(AgentRole::Router) && !s.hidden)
        .take(limit)
        .map(AgentIndexEntry::from)
        .collect()
}

/// Visible specialists, intersected with `domains` when non-empty.
pub fn build_specialist_index(
    agents: &[Agent],
    limit: usize,
    domains: &[String],
) -> Vec<AgentIndexEntry> {
    agents
        .iter()
        .map(build_agent_summary)
        .filter(|s| s.role == Some(AgentRole::Specialist) && !s.hidden)
        .filter(|s| domains.is_empty() || s.domains.iter().any(|d| domains.contains(d)))
        .take(limit)
        .map(AgentIndexEntry::from)
        .collect()
}

/// Aggregate roster counts: total, by domain, by role, top tags.
pub fn summarize_agents(agents: &[Agent]) -> Value {
    let mut by_domain: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_role: BTreeMap<String, u64> = BTreeMap::new();
    let mut tag_counts: BTreeMap<String, u64> = BTreeMap::new();

    for agent in agents {
        let summary = build_agent_summary(agent);
        for domain in &summary.domains {
            *by_domain.entry(domain.clone()).or_insert(0) += 1;
        }
        let role = summary
            .role
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        *by_role.entry(role).or_insert(0) += 1;
        for tag in &summary.tags {
            *tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    let mut tags: Vec<(String, u64)> = tag_counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_tags: Vec<String> = tags
        .into_iter()
        .take(TOP_TAG_LIMIT)
        .map(|(tag, _)| tag)
        .collect();

    json!({
        "total": agents.len(),
        "byDomain": by_domain,
        "byRole": by_role,
        "topTags": top_tags,
    })
}

/// Visited-slug set and depth carried through a run tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingState {
    pub visited_slugs: Vec<String>,
    pub routing_depth: u32,
}

/// Parse routing state out of a run's context. Non-numeric depth becomes 0;
/// negative depth is clamped to 0.
pub fn read_routing_state(context: Option<&Value>) -> RoutingState {
    let state = context.and_then(|c| c.get("routingState"));

    let visited_slugs = state
        .and_then(|s| s.get("visitedSlugs"))
        .and_then(|v| v.as_array())
        .map(|items| {
            normalize_strings(items.iter().filter_map(|i| i.as_str()))
        })
        .unwrap_or_default();

    let routing_depth = state
        .and_then(|s| s.get("routingDepth"))
        .and_then(|d| d.as_i64())
        .map(|d| d.max(0) as u32)
        .unwrap_or(0);

    RoutingState {
        visited_slugs,
        routing_depth,
    }
}

/// Bound an arbitrary result value for inclusion in child context.
///
/// Strings longer than 200 characters are truncated with an ellipsis, arrays
/// become `{type:"array",length}`, objects become `{type:"object",keys,
/// truncated}`. Already-summarized shapes pass through unchanged, so the
/// function is idempotent.
pub fn summarize_result(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            if s.chars().count() > SUMMARY_STRING_LIMIT {
                let prefix: String = s.chars().take(SUMMARY_STRING_LIMIT - 1).collect();
                Value::String(format!("{prefix}…"))
            } else {
                value.clone()
            }
        }
        Value::Array(items) => json!({ "type": "array", "length": items.len() }),
        Value::Object(map) => {
            if is_summary_shape(map) {
                return value.clone();
            }
            let keys: Vec<&String> = map.keys().take(SUMMARY_KEY_LIMIT).collect();
            json!({
                "type": "object",
                "keys": keys,
                "truncated": map.len() > SUMMARY_KEY_LIMIT,
            })
        }
        _ => value.clone(),
    }
}

fn is_summary_shape(map: &Map<String, Value>) -> bool {
    match map.get("type").and_then(|t| t.as_str()) {
        Some("array") => map.len() == 2 && map.contains_key("length"),
        Some("object") => map.len() == 3 && map.contains_key("keys") && map.contains_key("truncated"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{Actor, AgentMetadata, AgentVersionId};

    fn agent_with(slug: &str, name: &str, metadata: AgentMetadata) -> Agent {
        Agent::new(slug, name, "", AgentVersionId::new(), Actor::System, metadata)
    }

    #[test]
    fn normalize_drops_empty_and_trims() {
        let input = vec!["  a  ".to_string(), "".to_string(), "  ".to_string(), "b".to_string()];
        assert_eq!(normalize_strings(&input), vec!["a", "b"]);
    }

    #[test]
    fn merge_unique_is_stable_and_associative() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "z".to_string()];
        let c = vec!["z".to_string(), "w".to_string()];

        assert_eq!(merge_unique(&a, &b), vec!["x", "y", "z"]);

        let left = merge_unique(&merge_unique(&a, &b), &c);
        let right = merge_unique(&a, &merge_unique(&b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn router_tag_beats_specialist_tag() {
        let tags = vec!["specialist".to_string(), "router".to_string()];
        assert_eq!(infer_role_from_tags(&tags), Some(AgentRole::Router));
        assert_eq!(
            infer_role_from_tags(&["domain-router".to_string()]),
            Some(AgentRole::Router)
        );
        assert_eq!(
            infer_role_from_tags(&["specialist".to_string()]),
            Some(AgentRole::Specialist)
        );
        assert_eq!(infer_role_from_tags(&["misc".to_string()]), None);
    }

    #[test]
    fn domains_extracted_from_tags() {
        let tags = vec!["domain: Billing ".to_string(), "domain:ops".to_string(), "other".to_string()];
        assert_eq!(extract_domains_from_tags(&tags), vec!["billing", "ops"]);
    }

    #[test]
    fn domain_inferred_from_slug_and_name() {
        assert_eq!(
            infer_domain_from_label("Billing Router", "billing-router"),
            Some("billing".to_string())
        );
        assert_eq!(
            infer_domain_from_label("Ops Specialist", "ops_specialist"),
            Some("ops".to_string())
        );
        assert_eq!(
            infer_domain_from_label("Support Router", "helper"),
            Some("support".to_string())
        );
        assert_eq!(infer_domain_from_label("Echo", "echo"), None);
    }

    #[test]
    fn summary_prefers_metadata_over_inference() {
        let metadata = AgentMetadata {
            role: Some(AgentRole::Router),
            domains: vec!["billing".to_string()],
            tags: vec!["specialist".to_string(), "domain:ops".to_string()],
            ..Default::default()
        };
        let summary = build_agent_summary(&agent_with("ops-specialist", "Ops Specialist", metadata));
        assert_eq!(summary.role, Some(AgentRole::Router));
        assert_eq!(summary.domains, vec!["billing"]);
    }

    #[test]
    fn summary_inference_fills_gaps() {
        let metadata = AgentMetadata {
            tags: vec!["specialist".to_string()],
            ..Default::default()
        };
        let summary = build_agent_summary(&agent_with("ops-specialist", "Ops Specialist", metadata));
        assert_eq!(summary.role, Some(AgentRole::Specialist));
        assert_eq!(summary.domains, vec!["ops"]);
    }

    #[test]
    fn specialist_index_intersects_domains() {
        let ops = agent_with(
            "ops-specialist",
            "Ops Specialist",
            AgentMetadata {
                role: Some(AgentRole::Specialist),
                domains: vec!["ops".to_string()],
                ..Default::default()
            },
        );
        let billing = agent_with(
            "billing-specialist",
            "Billing Specialist",
            AgentMetadata {
                role: Some(AgentRole::Specialist),
                domains: vec!["billing".to_string()],
                ..Default::default()
            },
        );
        let agents = vec![ops, billing];

        let filtered = build_specialist_index(&agents, 50, &["ops".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].slug, "ops-specialist");

        let unfiltered = build_specialist_index(&agents, 50, &[]);
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn router_index_skips_hidden() {
        let visible = agent_with(
            "main-router",
            "Main Router",
            AgentMetadata {
                role: Some(AgentRole::Router),
                ..Default::default()
            },
        );
        let hidden = agent_with(
            "shadow-router",
            "Shadow Router",
            AgentMetadata {
                role: Some(AgentRole::Router),
                hidden: true,
                ..Default::default()
            },
        );
        let index = build_router_index(&[visible, hidden], 50);
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].slug, "main-router");
    }

    #[test]
    fn routing_state_clamps_bad_depth() {
        let ctx = json!({ "routingState": { "visitedSlugs": ["a", " "], "routingDepth": -4 } });
        let state = read_routing_state(Some(&ctx));
        assert_eq!(state.visited_slugs, vec!["a"]);
        assert_eq!(state.routing_depth, 0);

        let ctx = json!({ "routingState": { "routingDepth": "two" } });
        assert_eq!(read_routing_state(Some(&ctx)).routing_depth, 0);

        assert_eq!(read_routing_state(None).routing_depth, 0);
    }

    #[test]
    fn summarize_result_truncates_long_strings() {
        let long = "x".repeat(500);
        let summarized = summarize_result(&Value::String(long));
        let text = summarized.as_str().unwrap();
        assert_eq!(text.chars().count(), 200);
        assert!(text.ends_with('…'));

        let short = Value::String("hello".to_string());
        assert_eq!(summarize_result(&short), short);
    }

    #[test]
    fn summarize_result_is_idempotent() {
        let cases = vec![
            json!([1, 2, 3]),
            json!({ "a": 1, "b": 2 }),
            Value::String("y".repeat(400)),
        ];
        for case in cases {
            let once = summarize_result(&case);
            let twice = summarize_result(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn summarize_result_bounds_wide_objects() {
        let mut map = Map::new();
        for i in 0..30 {
            map.insert(format!("k{i:02}"), json!(i));
        }
        let summarized = summarize_result(&Value::Object(map));
        assert_eq!(summarized["type"], "object");
        assert_eq!(summarized["keys"].as_array().unwrap().len(), 20);
        assert_eq!(summarized["truncated"], true);
    }
}
