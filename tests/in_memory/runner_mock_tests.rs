//! Lifecycle behaviour against a mocked agent runner.

use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use super::helpers::{TestService, Wiring};
use async_trait::async_trait;
use eyre::{bail, ensure, eyre};
use mockall::{mock, predicate::eq};
use rstest::rstest;
use tasklane::agent_run::{
    domain::{
        ExternalRunId, IgnoredReport, PullRequest, RunStatus, RunStatusReport, RunType,
    },
    ports::{AgentRunner, AgentRunnerError, AgentRunnerResult, RunDispatch},
};
use tasklane::task::{
    domain::TaskStatus,
    services::{ReconcileOutcome, TaskLifecycleError},
};

mock! {
    pub Runner {}

    #[async_trait]
    impl AgentRunner for Runner {
        async fn create_run(&self, dispatch: &RunDispatch) -> AgentRunnerResult<ExternalRunId>;
        async fn run_status(&self, external_run_id: &ExternalRunId)
        -> AgentRunnerResult<RunStatusReport>;
    }
}

fn mock_run_id() -> ExternalRunId {
    ExternalRunId::new("mock-run-1").expect("valid external run id")
}

type ReportFor = Box<dyn Fn(&RunDispatch) -> RunStatusReport + Send + Sync>;

/// Runner that delivers a status callback before `create_run` returns.
struct CallbackRunner {
    service: OnceLock<Weak<TestService>>,
    report_for: ReportFor,
    outcomes: Mutex<Vec<ReconcileOutcome>>,
}

impl CallbackRunner {
    fn wired(report_for: ReportFor) -> eyre::Result<(Arc<Self>, Wiring)> {
        let runner = Arc::new(Self {
            service: OnceLock::new(),
            report_for,
            outcomes: Mutex::new(Vec::new()),
        });
        let wiring = Wiring::with_runner(Arc::clone(&runner) as Arc<dyn AgentRunner>);
        runner
            .service
            .set(Arc::downgrade(&wiring.service))
            .map_err(|_| eyre!("runner wired twice"))?;
        wiring.link_repository();
        Ok((runner, wiring))
    }

    fn outcomes(&self) -> Vec<ReconcileOutcome> {
        self.outcomes.lock().expect("outcome log").clone()
    }
}

#[async_trait]
impl AgentRunner for CallbackRunner {
    async fn create_run(&self, dispatch: &RunDispatch) -> AgentRunnerResult<ExternalRunId> {
        let service = self
            .service
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| AgentRunnerError::Unavailable("service not wired".to_owned()))?;
        let outcome = service
            .reconcile_run_status((self.report_for)(dispatch))
            .await
            .map_err(|err| AgentRunnerError::Unavailable(err.to_string()))?;
        self.outcomes.lock().expect("outcome log").push(outcome);
        Ok(mock_run_id())
    }

    async fn run_status(&self, external_run_id: &ExternalRunId)
    -> AgentRunnerResult<RunStatusReport> {
        Err(AgentRunnerError::UnknownRun(external_run_id.clone()))
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn implementation_dispatch_carries_repository_and_prompt() -> eyre::Result<()> {
    let mut runner = MockRunner::new();
    runner
        .expect_create_run()
        .withf(|dispatch| {
            dispatch.run_type == RunType::Implementation
                && dispatch
                    .repository
                    .as_ref()
                    .is_some_and(|repository| repository.full_name().to_string() == "acme/widgets")
                && dispatch.prompt.contains("Harden login")
                && dispatch.instructions.is_none()
        })
        .times(1)
        .returning(|_| Ok(mock_run_id()));
    runner.expect_run_status().never();

    let wiring = Wiring::with_runner(Arc::new(runner));
    wiring.link_repository();
    let task = wiring.agent_task("Harden login").await;

    let started = wiring.service.request_implementation_run(task.id()).await?;
    ensure!(started.run.external_run_id() == Some(&mock_run_id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn polling_applies_the_runner_status() -> eyre::Result<()> {
    let pull_request = PullRequest::from_parts("https://git.example/acme/widgets/pull/9", 9)?;
    let served = pull_request.clone();
    let mut runner = MockRunner::new();
    runner
        .expect_create_run()
        .times(1)
        .returning(|_| Ok(mock_run_id()));
    runner
        .expect_run_status()
        .with(eq(mock_run_id()))
        .times(1)
        .returning(move |external_run_id| {
            Ok(RunStatusReport::new(external_run_id.clone(), RunStatus::Finished)
                .with_pull_request(served.clone()))
        });

    let wiring = Wiring::with_runner(Arc::new(runner));
    wiring.link_repository();
    let task = wiring.agent_task("Harden login").await;
    let started = wiring.service.request_implementation_run(task.id()).await?;

    let outcome = wiring.service.refresh_run(started.run.id()).await?;
    let ReconcileOutcome::Applied { task: polled, run } = outcome else {
        bail!("polled status should apply");
    };
    ensure!(polled.status() == TaskStatus::InReview);
    ensure!(run.pull_request() == Some(&pull_request));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn polling_failure_surfaces_and_leaves_run_active() -> eyre::Result<()> {
    let mut runner = MockRunner::new();
    runner
        .expect_create_run()
        .times(1)
        .returning(|_| Ok(mock_run_id()));
    runner
        .expect_run_status()
        .returning(|_| Err(AgentRunnerError::Unavailable("503".to_owned())));

    let wiring = Wiring::with_runner(Arc::new(runner));
    wiring.link_repository();
    let task = wiring.agent_task("Harden login").await;
    let started = wiring.service.request_implementation_run(task.id()).await?;

    let refreshed = wiring.service.refresh_run(started.run.id()).await;
    ensure!(matches!(
        refreshed,
        Err(TaskLifecycleError::RunnerUnavailable { run_id, .. }) if run_id == started.run.id()
    ));
    ensure!(wiring.service.refresh_active_runs().await?.is_empty());

    let runs = wiring.service.runs_for_task(task.id()).await?;
    ensure!(runs.iter().all(|run| run.is_active()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn callback_before_create_returns_is_applied() -> eyre::Result<()> {
    let (runner, wiring) = CallbackRunner::wired(Box::new(|dispatch: &RunDispatch| {
        RunStatusReport::new(mock_run_id(), RunStatus::Running).with_run_id(dispatch.run_id)
    }))?;
    let task = wiring.agent_task("Stream progress").await;

    let request = wiring.service.request_implementation_run(task.id());
    let started = tokio::time::timeout(Duration::from_secs(5), request).await??;

    let outcomes = runner.outcomes();
    let [ReconcileOutcome::Applied { run: reported, .. }] = outcomes.as_slice() else {
        bail!("expected one applied callback, got {outcomes:?}");
    };
    ensure!(reported.status() == RunStatus::Running);
    ensure!(started.run.status() == RunStatus::Running);
    ensure!(started.run.external_run_id() == Some(&mock_run_id()));
    ensure!(started.task.status() == TaskStatus::InProgress);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn early_terminal_callback_moves_the_task_to_review() -> eyre::Result<()> {
    let (runner, wiring) = CallbackRunner::wired(Box::new(|dispatch: &RunDispatch| {
        let pull_request = PullRequest::from_parts("https://git.example/acme/widgets/pull/4", 4)
            .expect("valid pull request");
        RunStatusReport::new(mock_run_id(), RunStatus::Finished)
            .with_run_id(dispatch.run_id)
            .with_pull_request(pull_request)
    }))?;
    let task = wiring.agent_task("Quick fix").await;

    let request = wiring.service.request_implementation_run(task.id());
    let started = tokio::time::timeout(Duration::from_secs(5), request).await??;

    ensure!(matches!(
        runner.outcomes().as_slice(),
        [ReconcileOutcome::Applied { .. }]
    ));
    ensure!(started.run.status() == RunStatus::Finished);
    ensure!(started.run.external_run_id() == Some(&mock_run_id()));
    ensure!(started.task.status() == TaskStatus::InReview);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn early_callback_without_run_id_is_dropped() -> eyre::Result<()> {
    let (runner, wiring) = CallbackRunner::wired(Box::new(|_: &RunDispatch| {
        RunStatusReport::new(mock_run_id(), RunStatus::Running)
    }))?;
    let task = wiring.agent_task("Uncorrelated").await;

    let started = wiring.service.request_implementation_run(task.id()).await?;

    ensure!(matches!(
        runner.outcomes().as_slice(),
        [ReconcileOutcome::Ignored(IgnoredReport::UnknownRun)]
    ));
    ensure!(started.run.status() == RunStatus::Creating);
    ensure!(started.run.external_run_id() == Some(&mock_run_id()));
    Ok(())
}
