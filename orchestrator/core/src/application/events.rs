// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Append-only per-run event log.
//
// Allocates the next seq for a run and inserts the event. With one writer
// per run (siblings execute sequentially, roots own disjoint streams) the
// read-then-write allocation is race-free; the (run_id, seq) uniqueness
// index is the authoritative invariant and a duplicate-key error signals a
// protocol bug.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::event::{EventType, RunEvent};
use crate::domain::repository::{EventRepository, StoreError};
use crate::domain::run::RunId;

#[derive(Clone)]
pub struct EventLog {
    events: Arc<dyn EventRepository>,
}

impl EventLog {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Append one event to a run's stream and return it.
    pub async fn emit(
        &self,
        run_id: RunId,
        event_type: EventType,
        payload: Value,
    ) -> Result<RunEvent, StoreError> {
        let seq = self.events.max_seq(run_id).await? + 1;
        let event = RunEvent::new(run_id, seq, event_type, payload);
        self.events.insert(&event).await?;
        debug!(run_id = %run_id, seq, event = %event_type, "event emitted");
        Ok(event)
    }

    /// Highest seq currently recorded for a run (0 when none).
    pub async fn last_seq(&self, run_id: RunId) -> Result<u64, StoreError> {
        self.events.max_seq(run_id).await
    }
}
