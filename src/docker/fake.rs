//! In-memory stand-ins for the engine, used by tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::containers::ContainerQuery;
use super::runner::{EngineCommand, ProcessOutput, ProcessRunner};
use crate::error::DipResult;
use crate::model::{ContainerFilter, ContainerInfo};

/// Records every command and replays canned outputs in order.
/// Once the queue is empty every call succeeds with no output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<EngineCommand>>,
    responses: Mutex<VecDeque<ProcessOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = ProcessOutput>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    pub fn calls(&self) -> Vec<EngineCommand> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, cmd: EngineCommand) -> DipResult<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd);
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        Ok(next.unwrap_or_default())
    }
}

/// Exit-code-only response, for canned failures.
pub fn exit_with(code: i32) -> ProcessOutput {
    ProcessOutput {
        exit_code: code,
        ..ProcessOutput::default()
    }
}

/// A fixed container listing; filters are applied like the real engine query.
#[derive(Debug, Default)]
pub struct StaticContainers {
    containers: Vec<ContainerInfo>,
    queries: Mutex<usize>,
}

impl StaticContainers {
    pub fn new(containers: Vec<ContainerInfo>) -> Self {
        Self {
            containers,
            queries: Mutex::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().map(|q| *q).unwrap_or_default()
    }
}

#[async_trait]
impl ContainerQuery for StaticContainers {
    async fn list(&self, filter: &ContainerFilter) -> DipResult<Vec<ContainerInfo>> {
        if let Ok(mut queries) = self.queries.lock() {
            *queries += 1;
        }
        Ok(self
            .containers
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }
}
