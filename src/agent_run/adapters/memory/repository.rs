//! In-memory repository for agent runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agent_run::{
    domain::{AgentRun, AgentRunId, ExternalRunId, PullRequestUrl, RunType},
    ports::{AgentRunRepository, AgentRunRepositoryError, AgentRunRepositoryResult},
};
use crate::task::domain::TaskId;

/// Thread-safe in-memory agent run repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRunRepository {
    state: Arc<RwLock<InMemoryRunState>>,
}

#[derive(Debug, Default)]
struct InMemoryRunState {
    runs: HashMap<AgentRunId, AgentRun>,
    external_index: HashMap<ExternalRunId, AgentRunId>,
}

impl InMemoryAgentRunRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(message: &str) -> AgentRunRepositoryError {
    AgentRunRepositoryError::persistence(std::io::Error::other(message.to_owned()))
}

fn claim_external_id(
    state: &mut InMemoryRunState,
    run: &AgentRun,
) -> AgentRunRepositoryResult<()> {
    let Some(external_run_id) = run.external_run_id() else {
        return Ok(());
    };
    match state.external_index.get(external_run_id) {
        Some(owner) if *owner != run.id() => Err(AgentRunRepositoryError::DuplicateExternalRun(
            external_run_id.clone(),
        )),
        _ => {
            state
                .external_index
                .insert(external_run_id.clone(), run.id());
            Ok(())
        }
    }
}

fn sorted_by_start(mut runs: Vec<AgentRun>) -> Vec<AgentRun> {
    runs.sort_by_key(AgentRun::started_at);
    runs
}

#[async_trait]
impl AgentRunRepository for InMemoryAgentRunRepository {
    async fn insert(&self, run: &AgentRun) -> AgentRunRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| lock_error(&err.to_string()))?;
        if state.runs.contains_key(&run.id()) {
            return Err(AgentRunRepositoryError::DuplicateRun(run.id()));
        }
        if run.is_active() {
            let contended = state.runs.values().any(|existing| {
                existing.task_id() == run.task_id()
                    && existing.run_type() == run.run_type()
                    && existing.is_active()
            });
            if contended {
                return Err(AgentRunRepositoryError::ActiveRunExists {
                    task_id: run.task_id(),
                    run_type: run.run_type(),
                });
            }
        }
        claim_external_id(&mut state, run)?;
        state.runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &AgentRun) -> AgentRunRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| lock_error(&err.to_string()))?;
        if !state.runs.contains_key(&run.id()) {
            return Err(AgentRunRepositoryError::NotFound(run.id()));
        }
        claim_external_id(&mut state, run)?;
        state.runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AgentRunId) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        Ok(state.runs.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_run_id: &ExternalRunId,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        Ok(state
            .external_index
            .get(external_run_id)
            .and_then(|id| state.runs.get(id))
            .cloned())
    }

    async fn find_by_pull_request_url(
        &self,
        url: &PullRequestUrl,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        Ok(state
            .runs
            .values()
            .filter(|run| run.pull_request().is_some_and(|pr| pr.url() == url))
            .max_by_key(|run| run.started_at())
            .cloned())
    }

    async fn find_active(
        &self,
        task_id: TaskId,
        run_type: RunType,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        Ok(state
            .runs
            .values()
            .find(|run| run.task_id() == task_id && run.run_type() == run_type && run.is_active())
            .cloned())
    }

    async fn list_for_task(&self, task_id: TaskId) -> AgentRunRepositoryResult<Vec<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        let runs = state
            .runs
            .values()
            .filter(|run| run.task_id() == task_id)
            .cloned()
            .collect();
        Ok(sorted_by_start(runs))
    }

    async fn list_active(&self) -> AgentRunRepositoryResult<Vec<AgentRun>> {
        let state = self
            .state
            .read()
            .map_err(|err| lock_error(&err.to_string()))?;
        let runs = state
            .runs
            .values()
            .filter(|run| run.is_active())
            .cloned()
            .collect();
        Ok(sorted_by_start(runs))
    }
}
