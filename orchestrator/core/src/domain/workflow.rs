// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Domain Model
//!
//! A workflow is a saved linear DAG of named nodes, each bound to an agent
//! slug. Nodes are evaluated in persisted order; parents must precede their
//! children in that order. No implicit topological sort is performed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    pub agent_slug: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub include_user_prompt: bool,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Saved DAG definition.
///
/// # Invariants
/// - Node ids are unique and non-empty
/// - Every node has a non-empty agent slug
/// - Every declared parent references a node earlier in the list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<WorkflowNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a new workflow with validation.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        nodes: Vec<WorkflowNode>,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::InvalidName);
        }
        Self::validate_nodes(&nodes)?;

        let now = Utc::now();
        Ok(Self {
            id: WorkflowId::new(),
            name,
            description,
            nodes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the definition of an existing workflow, revalidating.
    pub fn update(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        nodes: Vec<WorkflowNode>,
    ) -> Result<(), WorkflowError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::InvalidName);
        }
        Self::validate_nodes(&nodes)?;
        self.name = name;
        self.description = description;
        self.nodes = nodes;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn validate_nodes(nodes: &[WorkflowNode]) -> Result<(), WorkflowError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for node in nodes {
            if node.id.trim().is_empty() {
                return Err(WorkflowError::InvalidNodeId);
            }
            if node.agent_slug.trim().is_empty() {
                return Err(WorkflowError::MissingAgentSlug(node.id.clone()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::DuplicateNodeId(node.id.clone()));
            }
            for parent in &node.parents {
                if !seen.contains(parent.as_str()) || parent == &node.id {
                    return Err(WorkflowError::ParentOutOfOrder {
                        node: node.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow name cannot be empty")]
    InvalidName,

    #[error("Workflow node id cannot be empty")]
    InvalidNodeId,

    #[error("Duplicate workflow node id: {0}")]
    DuplicateNodeId(String),

    #[error("Workflow node {0} is missing an agent slug")]
    MissingAgentSlug(String),

    #[error("Node {node} references parent {parent} that does not precede it")]
    ParentOutOfOrder { node: String, parent: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parents: &[&str]) -> WorkflowNode {
        WorkflowNode {
            id: id.to_string(),
            agent_slug: format!("{id}-agent"),
            label: String::new(),
            include_user_prompt: false,
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_parents_that_precede() {
        let wf = Workflow::new(
            "pipeline",
            None,
            vec![node("a", &[]), node("b", &["a"]), node("c", &["a", "b"])],
        );
        assert!(wf.is_ok());
    }

    #[test]
    fn rejects_forward_parent_reference() {
        let result = Workflow::new("pipeline", None, vec![node("a", &["b"]), node("b", &[])]);
        assert!(matches!(
            result,
            Err(WorkflowError::ParentOutOfOrder { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let result = Workflow::new("pipeline", None, vec![node("a", &[]), node("a", &[])]);
        assert!(matches!(result, Err(WorkflowError::DuplicateNodeId(_))));
    }

    #[test]
    fn rejects_self_parent() {
        let result = Workflow::new("pipeline", None, vec![node("a", &["a"])]);
        assert!(matches!(
            result,
            Err(WorkflowError::ParentOutOfOrder { .. })
        ));
    }
}
