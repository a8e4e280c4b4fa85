//! `PostgreSQL` repository implementation for agent run storage.

use super::{
    models::{AgentRunRow, NewAgentRunRow},
    schema::agent_runs,
};
use crate::agent_run::{
    domain::{
        AgentRun, AgentRunId, ExternalRunId, PersistedAgentRunData, PullRequest,
        PullRequestNumber, PullRequestStatus, PullRequestUrl, ReportDigest, RunStatus, RunType,
    },
    ports::{AgentRunRepository, AgentRunRepositoryError, AgentRunRepositoryResult},
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by agent run adapters.
pub type AgentRunPgPool = Pool<ConnectionManager<PgConnection>>;

const ACTIVE_STATUSES: [&str; 2] = ["creating", "running"];
const ACTIVE_PER_TYPE_INDEX: &str = "idx_agent_runs_active_per_type";
const EXTERNAL_ID_INDEX: &str = "idx_agent_runs_external_run_id";

/// `PostgreSQL`-backed agent run repository.
///
/// The one-active-run-per-type rule is enforced by the partial unique index
/// `idx_agent_runs_active_per_type`, so concurrent inserts race safely.
#[derive(Debug, Clone)]
pub struct PostgresAgentRunRepository {
    pool: AgentRunPgPool,
}

impl PostgresAgentRunRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: AgentRunPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> AgentRunRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AgentRunRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AgentRunRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(AgentRunRepositoryError::persistence)?
    }
}

#[async_trait]
impl AgentRunRepository for PostgresAgentRunRepository {
    async fn insert(&self, run: &AgentRun) -> AgentRunRepositoryResult<()> {
        let run_id = run.id();
        let task_id = run.task_id();
        let run_type = run.run_type();
        let external_run_id = run.external_run_id().cloned();
        let new_row = to_new_row(run)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(agent_runs::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if violates(info.as_ref(), ACTIVE_PER_TYPE_INDEX) =>
                    {
                        AgentRunRepositoryError::ActiveRunExists { task_id, run_type }
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if violates(info.as_ref(), EXTERNAL_ID_INDEX) =>
                    {
                        external_run_id.clone().map_or_else(
                            || AgentRunRepositoryError::persistence(err_clone(info.as_ref())),
                            AgentRunRepositoryError::DuplicateExternalRun,
                        )
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        AgentRunRepositoryError::DuplicateRun(run_id)
                    }
                    _ => AgentRunRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, run: &AgentRun) -> AgentRunRepositoryResult<()> {
        let run_id = run.id();
        let external_run_id = run.external_run_id().cloned();
        let row = to_new_row(run)?;

        self.run_blocking(move |connection| {
            let updated_count =
                diesel::update(agent_runs::table.filter(agent_runs::id.eq(row.id)))
                    .set((
                        agent_runs::external_run_id.eq(&row.external_run_id),
                        agent_runs::status.eq(&row.status),
                        agent_runs::abandoned.eq(row.abandoned),
                        agent_runs::instructions.eq(&row.instructions),
                        agent_runs::pr_url.eq(&row.pr_url),
                        agent_runs::pr_number.eq(row.pr_number),
                        agent_runs::pr_status.eq(&row.pr_status),
                        agent_runs::summary.eq(&row.summary),
                        agent_runs::error_message.eq(&row.error_message),
                        agent_runs::last_sequence.eq(row.last_sequence),
                        agent_runs::last_report_digest.eq(&row.last_report_digest),
                        agent_runs::updated_at.eq(row.updated_at),
                        agent_runs::finished_at.eq(row.finished_at),
                    ))
                    .execute(connection)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                            if violates(info.as_ref(), EXTERNAL_ID_INDEX) =>
                        {
                            external_run_id.clone().map_or_else(
                                || AgentRunRepositoryError::persistence(err_clone(info.as_ref())),
                                AgentRunRepositoryError::DuplicateExternalRun,
                            )
                        }
                        _ => AgentRunRepositoryError::persistence(err),
                    })?;

            if updated_count == 0 {
                return Err(AgentRunRepositoryError::NotFound(run_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: AgentRunId) -> AgentRunRepositoryResult<Option<AgentRun>> {
        self.run_blocking(move |connection| {
            let row = agent_runs::table
                .filter(agent_runs::id.eq(id.into_inner()))
                .select(AgentRunRow::as_select())
                .first::<AgentRunRow>(connection)
                .optional()
                .map_err(AgentRunRepositoryError::persistence)?;
            row.map(row_to_run).transpose()
        })
        .await
    }

    async fn find_by_external_id(
        &self,
        external_run_id: &ExternalRunId,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let lookup = external_run_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = agent_runs::table
                .filter(agent_runs::external_run_id.eq(&lookup))
                .select(AgentRunRow::as_select())
                .first::<AgentRunRow>(connection)
                .optional()
                .map_err(AgentRunRepositoryError::persistence)?;
            row.map(row_to_run).transpose()
        })
        .await
    }

    async fn find_by_pull_request_url(
        &self,
        url: &PullRequestUrl,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        let lookup = url.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = agent_runs::table
                .filter(agent_runs::pr_url.eq(&lookup))
                .order(agent_runs::started_at.desc())
                .select(AgentRunRow::as_select())
                .first::<AgentRunRow>(connection)
                .optional()
                .map_err(AgentRunRepositoryError::persistence)?;
            row.map(row_to_run).transpose()
        })
        .await
    }

    async fn find_active(
        &self,
        task_id: TaskId,
        run_type: RunType,
    ) -> AgentRunRepositoryResult<Option<AgentRun>> {
        self.run_blocking(move |connection| {
            let row = agent_runs::table
                .filter(agent_runs::task_id.eq(task_id.into_inner()))
                .filter(agent_runs::run_type.eq(run_type.as_str()))
                .filter(agent_runs::status.eq_any(ACTIVE_STATUSES))
                .select(AgentRunRow::as_select())
                .first::<AgentRunRow>(connection)
                .optional()
                .map_err(AgentRunRepositoryError::persistence)?;
            row.map(row_to_run).transpose()
        })
        .await
    }

    async fn list_for_task(&self, task_id: TaskId) -> AgentRunRepositoryResult<Vec<AgentRun>> {
        self.run_blocking(move |connection| {
            let rows = agent_runs::table
                .filter(agent_runs::task_id.eq(task_id.into_inner()))
                .order(agent_runs::started_at.asc())
                .select(AgentRunRow::as_select())
                .load::<AgentRunRow>(connection)
                .map_err(AgentRunRepositoryError::persistence)?;
            rows.into_iter().map(row_to_run).collect()
        })
        .await
    }

    async fn list_active(&self) -> AgentRunRepositoryResult<Vec<AgentRun>> {
        self.run_blocking(move |connection| {
            let rows = agent_runs::table
                .filter(agent_runs::status.eq_any(ACTIVE_STATUSES))
                .order(agent_runs::started_at.asc())
                .select(AgentRunRow::as_select())
                .load::<AgentRunRow>(connection)
                .map_err(AgentRunRepositoryError::persistence)?;
            rows.into_iter().map(row_to_run).collect()
        })
        .await
    }
}

fn violates(info: &dyn DatabaseErrorInformation, constraint: &str) -> bool {
    info.constraint_name().is_some_and(|name| name == constraint)
}

fn err_clone(info: &dyn DatabaseErrorInformation) -> std::io::Error {
    std::io::Error::other(info.message().to_owned())
}

fn to_optional_i64(value: Option<u64>) -> AgentRunRepositoryResult<Option<i64>> {
    value
        .map(i64::try_from)
        .transpose()
        .map_err(AgentRunRepositoryError::persistence)
}

fn to_optional_u64(value: Option<i64>) -> AgentRunRepositoryResult<Option<u64>> {
    value
        .map(u64::try_from)
        .transpose()
        .map_err(AgentRunRepositoryError::persistence)
}

pub(super) fn to_new_row(run: &AgentRun) -> AgentRunRepositoryResult<NewAgentRunRow> {
    let pull_request = run.pull_request();
    Ok(NewAgentRunRow {
        id: run.id().into_inner(),
        task_id: run.task_id().into_inner(),
        run_type: run.run_type().as_str().to_owned(),
        external_run_id: run.external_run_id().map(|id| id.as_str().to_owned()),
        status: run.status().as_str().to_owned(),
        abandoned: run.is_abandoned(),
        instructions: run.instructions().map(str::to_owned),
        pr_url: pull_request.map(|pr| pr.url().as_str().to_owned()),
        pr_number: to_optional_i64(pull_request.map(|pr| pr.number().value()))?,
        pr_status: pull_request.map(|pr| pr.status().as_str().to_owned()),
        summary: run.summary().map(str::to_owned),
        error_message: run.error_message().map(str::to_owned),
        last_sequence: to_optional_i64(run.last_sequence())?,
        last_report_digest: run.last_report_digest().map(|digest| digest.as_str().to_owned()),
        started_at: run.started_at(),
        updated_at: run.updated_at(),
        finished_at: run.finished_at(),
    })
}

fn row_to_pull_request(
    url: Option<String>,
    number: Option<i64>,
    status: Option<String>,
) -> AgentRunRepositoryResult<Option<PullRequest>> {
    let (Some(persisted_url), Some(persisted_number), Some(persisted_status)) =
        (url, number, status)
    else {
        return Ok(None);
    };
    let parsed_url =
        PullRequestUrl::new(persisted_url).map_err(AgentRunRepositoryError::persistence)?;
    let parsed_number = u64::try_from(persisted_number)
        .map_err(AgentRunRepositoryError::persistence)
        .and_then(|value| {
            PullRequestNumber::new(value).map_err(AgentRunRepositoryError::persistence)
        })?;
    let parsed_status = PullRequestStatus::try_from(persisted_status.as_str())
        .map_err(AgentRunRepositoryError::persistence)?;
    Ok(Some(PullRequest::from_persisted(
        parsed_url,
        parsed_number,
        parsed_status,
    )))
}

pub(super) fn row_to_run(row: AgentRunRow) -> AgentRunRepositoryResult<AgentRun> {
    let AgentRunRow {
        id,
        task_id,
        run_type,
        external_run_id,
        status,
        abandoned,
        instructions,
        pr_url,
        pr_number,
        pr_status,
        summary,
        error_message,
        last_sequence,
        last_report_digest,
        started_at,
        updated_at,
        finished_at,
    } = row;

    let data = PersistedAgentRunData {
        id: AgentRunId::from_uuid(id),
        task_id: TaskId::from_uuid(task_id),
        run_type: RunType::try_from(run_type.as_str())
            .map_err(AgentRunRepositoryError::persistence)?,
        external_run_id: external_run_id
            .map(ExternalRunId::new)
            .transpose()
            .map_err(AgentRunRepositoryError::persistence)?,
        status: RunStatus::try_from(status.as_str())
            .map_err(AgentRunRepositoryError::persistence)?,
        abandoned,
        instructions,
        pull_request: row_to_pull_request(pr_url, pr_number, pr_status)?,
        summary,
        error_message,
        last_sequence: to_optional_u64(last_sequence)?,
        last_report_digest: last_report_digest.map(ReportDigest::from_persisted),
        started_at,
        updated_at,
        finished_at,
    };
    Ok(AgentRun::from_persisted(data))
}
