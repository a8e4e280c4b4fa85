//! Shared world state for task agent lifecycle BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tasklane::agent_run::{
    adapters::memory::{InMemoryAgentRunRepository, InMemoryAgentRunner},
    domain::{AgentRun, PullRequest, RunStatusReport},
};
use tasklane::config::LifecycleConfig;
use tasklane::context::{
    adapters::memory::{InMemoryContextReferenceRepository, InMemoryContextStore},
    services::ContextAssemblyService,
};
use tasklane::task::{
    adapters::memory::{InMemoryCommentRepository, InMemoryTaskRepository, StaticRepositoryLinks},
    domain::{Task, WorkspaceId},
    services::{
        LifecyclePorts, PostedComment, ReconcileOutcome, StartedRun, TaskLifecycleError,
        TaskLifecycleService,
    },
};

/// Service type used by the BDD world.
pub type TestLifecycleService = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryAgentRunRepository,
    InMemoryCommentRepository,
    DefaultClock,
>;

/// Scenario world for task agent lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub service: TestLifecycleService,
    pub links: Arc<StaticRepositoryLinks>,
    pub workspace_id: WorkspaceId,
    pub task: Option<Task>,
    pub last_run: Option<AgentRun>,
    pub pull_request: Option<PullRequest>,
    pub last_request: Option<Result<StartedRun, TaskLifecycleError>>,
    pub last_comment: Option<PostedComment>,
}

impl LifecycleWorld {
    /// Creates a world with an empty workspace.
    ///
    /// # Panics
    ///
    /// Panics if the default configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let config = LifecycleConfig::default();
        let clock = Arc::new(DefaultClock);
        let links = Arc::new(StaticRepositoryLinks::new());
        let context = Arc::new(ContextAssemblyService::new(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(InMemoryContextReferenceRepository::new()),
            Arc::clone(&clock),
            &config,
        ));
        let service = TaskLifecycleService::new(
            LifecyclePorts {
                tasks: Arc::new(InMemoryTaskRepository::new()),
                runs: Arc::new(InMemoryAgentRunRepository::new()),
                comments: Arc::new(InMemoryCommentRepository::new()),
                runner: Arc::new(InMemoryAgentRunner::new()),
                repository_links: Arc::clone(&links) as _,
                context,
                clock,
            },
            config,
        )
        .expect("default configuration is valid");

        Self {
            service,
            links,
            workspace_id: WorkspaceId::new(),
            task: None,
            last_run: None,
            pull_request: None,
            last_request: None,
            last_comment: None,
        }
    }

    /// Returns the scenario task as currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created or it cannot be loaded.
    pub fn current_task(&self) -> Result<Task, eyre::Report> {
        let task_id = self
            .task
            .as_ref()
            .map(Task::id)
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))?;
        run_async(self.service.find_task(task_id))?
            .ok_or_else(|| eyre::eyre!("task {task_id} disappeared"))
    }

    /// Returns the most recently started run.
    ///
    /// # Errors
    ///
    /// Returns an error when no run was started.
    pub fn last_run(&self) -> Result<&AgentRun, eyre::Report> {
        self.last_run
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing agent run in scenario world"))
    }

    /// Applies a runner report and keeps the world's task and run current.
    ///
    /// # Errors
    ///
    /// Returns an error when reconciliation fails or the report is ignored.
    pub fn apply(&mut self, report: RunStatusReport) -> Result<(), eyre::Report> {
        match run_async(self.service.reconcile_run_status(report))? {
            ReconcileOutcome::Applied { task, run } => {
                self.task = Some(task);
                self.last_run = Some(run);
                Ok(())
            }
            ReconcileOutcome::Ignored(reason) => Err(eyre::eyre!("report ignored: {reason:?}")),
        }
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
