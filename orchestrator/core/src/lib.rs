// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Arbor Core
//!
//! Agent orchestration engine: versioned LLM agents executed as recursive,
//! observable runs behind a JSON-RPC surface.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
