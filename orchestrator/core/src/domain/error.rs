// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::llm::ModelError;
use crate::domain::repository::StoreError;
use crate::domain::workflow::WorkflowError;

/// Engine-level error. The run executor traps these once at the run
/// boundary; the RPC layer maps them to JSON-RPC error responses. Display
/// output is the message stored on failed runs, so variants render the bare
/// message.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad input: missing params, malformed plan shapes, invalid specs.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Routing policy violation: depth, fan-out, anti-loop, spawn cap,
    /// role discipline.
    #[error("{0}")]
    Policy(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }
}
