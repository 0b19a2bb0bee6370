// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod events;
pub mod executor;
pub mod resolver;
pub mod workflow_runner;

pub use events::EventLog;
pub use executor::{ExecutorSettings, RoutingPolicy, RunExecutor, SPAWN_CAP};
pub use resolver::{AgentResolution, AgentResolver, AgentSpec};
pub use workflow_runner::{WorkflowNodeRun, WorkflowRunReport, WorkflowRunner};
