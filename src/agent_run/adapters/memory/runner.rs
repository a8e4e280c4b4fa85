//! Scripted in-memory agent runner.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::agent_run::{
    domain::{ExternalRunId, RunStatus, RunStatusReport},
    ports::{AgentRunner, AgentRunnerError, AgentRunnerResult, RunDispatch},
};

/// Agent runner that records dispatches and serves scripted statuses.
///
/// External identifiers are allocated as `ext-run-1`, `ext-run-2`, and so
/// on. Statuses start at `creating` and change only through
/// [`InMemoryAgentRunner::set_status`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRunner {
    state: Arc<Mutex<RunnerState>>,
}

#[derive(Debug, Default)]
struct RunnerState {
    next_id: u64,
    dispatches: Vec<RunDispatch>,
    statuses: HashMap<ExternalRunId, RunStatusReport>,
    failure: Option<AgentRunnerError>,
}

impl InMemoryAgentRunner {
    /// Creates a runner that accepts every dispatch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent call fail with `error` until
    /// [`InMemoryAgentRunner::recover`] is called.
    pub fn fail_with(&self, error: AgentRunnerError) {
        self.state().failure = Some(error);
    }

    /// Clears a failure installed by [`InMemoryAgentRunner::fail_with`].
    pub fn recover(&self) {
        self.state().failure = None;
    }

    /// Replaces the status served for the report's run.
    pub fn set_status(&self, report: RunStatusReport) {
        self.state()
            .statuses
            .insert(report.external_run_id().clone(), report);
    }

    /// Returns every accepted dispatch in arrival order.
    #[must_use]
    pub fn dispatches(&self) -> Vec<RunDispatch> {
        self.state().dispatches.clone()
    }
}

#[async_trait]
impl AgentRunner for InMemoryAgentRunner {
    async fn create_run(&self, dispatch: &RunDispatch) -> AgentRunnerResult<ExternalRunId> {
        let mut state = self.state();
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        state.next_id = state.next_id.saturating_add(1);
        let external_run_id = ExternalRunId::new(format!("ext-run-{}", state.next_id))
            .map_err(|err| AgentRunnerError::Rejected(err.to_string()))?;
        state.dispatches.push(dispatch.clone());
        state.statuses.insert(
            external_run_id.clone(),
            RunStatusReport::new(external_run_id.clone(), RunStatus::Creating),
        );
        Ok(external_run_id)
    }

    async fn run_status(
        &self,
        external_run_id: &ExternalRunId,
    ) -> AgentRunnerResult<RunStatusReport> {
        let state = self.state();
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        state
            .statuses
            .get(external_run_id)
            .cloned()
            .ok_or_else(|| AgentRunnerError::UnknownRun(external_run_id.clone()))
    }
}
