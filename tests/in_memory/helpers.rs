//! Shared wiring for in-memory lifecycle integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tasklane::agent_run::{
    adapters::memory::{InMemoryAgentRunRepository, InMemoryAgentRunner},
    domain::{AgentRun, ExternalRunId, RunStatus, RunStatusReport},
    ports::AgentRunner,
};
use tasklane::config::LifecycleConfig;
use tasklane::context::{
    adapters::memory::{InMemoryContextReferenceRepository, InMemoryContextStore},
    services::ContextAssemblyService,
};
use tasklane::task::{
    adapters::memory::{InMemoryCommentRepository, InMemoryTaskRepository, StaticRepositoryLinks},
    domain::{Assignee, LinkedRepository, Task, WorkspaceId},
    services::{CreateTaskRequest, LifecyclePorts, TaskLifecycleService},
};

/// Lifecycle service wired to in-memory adapters.
pub type TestService = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryAgentRunRepository,
    InMemoryCommentRepository,
    DefaultClock,
>;

/// A shareable service plus handles on its in-memory collaborators.
pub struct Wiring {
    /// Service under test.
    pub service: Arc<TestService>,
    /// Scripted runner, when the default runner is in use.
    pub runner: Arc<InMemoryAgentRunner>,
    /// Run history.
    pub runs: Arc<InMemoryAgentRunRepository>,
    /// Workspace repository links.
    pub links: Arc<StaticRepositoryLinks>,
    /// Workspace context pool.
    pub store: Arc<InMemoryContextStore>,
    /// Workspace the tasks are created in.
    pub workspace_id: WorkspaceId,
}

impl Wiring {
    /// Wires the service with default configuration and the scripted runner.
    #[must_use]
    pub fn new() -> Self {
        let runner = Arc::new(InMemoryAgentRunner::new());
        Self::build(
            LifecycleConfig::default(),
            Arc::clone(&runner) as Arc<dyn AgentRunner>,
            runner,
        )
    }

    /// Wires the service with `config` and the scripted runner.
    #[must_use]
    pub fn with_config(config: LifecycleConfig) -> Self {
        let runner = Arc::new(InMemoryAgentRunner::new());
        Self::build(config, Arc::clone(&runner) as Arc<dyn AgentRunner>, runner)
    }

    /// Wires the service against a caller-supplied runner.
    #[must_use]
    pub fn with_runner(runner: Arc<dyn AgentRunner>) -> Self {
        Self::build(
            LifecycleConfig::default(),
            runner,
            Arc::new(InMemoryAgentRunner::new()),
        )
    }

    fn build(
        config: LifecycleConfig,
        active_runner: Arc<dyn AgentRunner>,
        scripted: Arc<InMemoryAgentRunner>,
    ) -> Self {
        let clock = Arc::new(DefaultClock);
        let runs = Arc::new(InMemoryAgentRunRepository::new());
        let links = Arc::new(StaticRepositoryLinks::new());
        let store = Arc::new(InMemoryContextStore::new());
        let context = Arc::new(ContextAssemblyService::new(
            Arc::clone(&store) as _,
            Arc::new(InMemoryContextReferenceRepository::new()),
            Arc::clone(&clock),
            &config,
        ));
        let service = TaskLifecycleService::new(
            LifecyclePorts {
                tasks: Arc::new(InMemoryTaskRepository::new()),
                runs: Arc::clone(&runs),
                comments: Arc::new(InMemoryCommentRepository::new()),
                runner: active_runner,
                repository_links: Arc::clone(&links) as _,
                context,
                clock,
            },
            config,
        )
        .expect("default configuration is valid");

        Self {
            service: Arc::new(service),
            runner: scripted,
            runs,
            links,
            store,
            workspace_id: WorkspaceId::new(),
        }
    }

    /// Links `acme/widgets` on GitHub to the workspace.
    pub fn link_repository(&self) {
        let repository = LinkedRepository::from_parts("github", "acme/widgets", "main")
            .expect("valid repository link");
        self.links
            .link(self.workspace_id, repository)
            .expect("link repository");
    }

    /// Creates a `todo` task assigned to the agent.
    pub async fn agent_task(&self, title: &str) -> Task {
        self.service
            .create_task(
                CreateTaskRequest::new(self.workspace_id, title).with_assignee(Assignee::Agent),
            )
            .await
            .expect("task creation should succeed")
    }
}

impl Default for Wiring {
    fn default() -> Self {
        Self::new()
    }
}

/// Provides freshly wired in-memory collaborators.
#[fixture]
pub fn wiring() -> Wiring {
    Wiring::new()
}

/// Returns the external identifier of a dispatched run.
#[must_use]
pub fn external_id(run: &AgentRun) -> ExternalRunId {
    run.external_run_id()
        .cloned()
        .expect("run should have been dispatched")
}

/// Builds a runner report for a dispatched run.
#[must_use]
pub fn report(run: &AgentRun, status: RunStatus) -> RunStatusReport {
    RunStatusReport::new(external_id(run), status)
}
