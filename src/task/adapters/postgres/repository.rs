//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{NewTaskRow, TaskRow},
    schema::tasks,
};
use crate::agent_run::domain::AgentRunId;
use crate::task::{
    domain::{
        Assignee, PersistedTaskData, PlanStatus, QueuedInstruction, Task, TaskId, TaskStatus,
        WorkspaceId,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_new_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let task_id = task.id();
        let expected = task.revision();
        let updated = task.clone().with_next_revision();
        let row = to_new_row(&updated)?;
        let expected_column = to_i64(expected)?;

        self.run_blocking(move |connection| {
            let updated_count = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(task_id.into_inner()))
                    .filter(tasks::revision.eq(expected_column)),
            )
            .set(&row)
            .execute(connection)
            .map_err(TaskRepositoryError::persistence)?;

            if updated_count > 0 {
                return Ok(updated);
            }

            let found = tasks::table
                .filter(tasks::id.eq(task_id.into_inner()))
                .select(tasks::revision)
                .first::<i64>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            match found {
                None => Err(TaskRepositoryError::NotFound(task_id)),
                Some(revision) => Err(TaskRepositoryError::StaleRevision {
                    task_id,
                    expected,
                    found: to_u64(revision)?,
                }),
            }
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::parent_id.eq(parent_id.into_inner()))
                .order((tasks::order_index.asc(), tasks::created_at.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn list_by_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::workspace_id.eq(workspace_id.into_inner()))
                .order((tasks::order_index.asc(), tasks::created_at.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }
}

fn to_i64(value: u64) -> TaskRepositoryResult<i64> {
    i64::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn to_u64(value: i64) -> TaskRepositoryResult<u64> {
    u64::try_from(value).map_err(TaskRepositoryError::persistence)
}

pub(super) fn to_new_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    let queued_instructions = serde_json::to_value(task.queued_instructions())
        .map_err(TaskRepositoryError::persistence)?;

    Ok(NewTaskRow {
        id: task.id().into_inner(),
        workspace_id: task.workspace_id().into_inner(),
        title: task.title().to_owned(),
        description: task.description().map(str::to_owned),
        prompt: task.prompt().map(str::to_owned),
        plan: task.plan().map(str::to_owned),
        plan_generated_at: task.plan_generated_at(),
        plan_status: task.plan_status().map(|status| status.as_str().to_owned()),
        status: task.status().as_str().to_owned(),
        assignee: task.assignee().map(|assignee| assignee.as_str().to_owned()),
        agent_type: task.agent_type().map(str::to_owned),
        current_planning_run_id: task.current_planning_run().map(AgentRunId::into_inner),
        current_run_id: task.current_run().map(AgentRunId::into_inner),
        parent_id: task.parent_id().map(TaskId::into_inner),
        order_index: task.order_index(),
        error_message: task.error_message().map(str::to_owned),
        queued_instructions,
        revision: to_i64(task.revision())?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
        archived_at: task.archived_at(),
    })
}

pub(super) fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        workspace_id,
        title,
        description,
        prompt,
        plan,
        plan_generated_at,
        plan_status,
        status,
        assignee,
        agent_type,
        current_planning_run_id,
        current_run_id,
        parent_id,
        order_index,
        error_message,
        queued_instructions,
        revision,
        created_at,
        updated_at,
        completed_at,
        archived_at,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        workspace_id: WorkspaceId::from_uuid(workspace_id),
        title,
        description,
        prompt,
        plan,
        plan_generated_at,
        plan_status: plan_status
            .as_deref()
            .map(PlanStatus::try_from)
            .transpose()
            .map_err(TaskRepositoryError::persistence)?,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskRepositoryError::persistence)?,
        assignee: assignee
            .as_deref()
            .map(Assignee::try_from)
            .transpose()
            .map_err(TaskRepositoryError::persistence)?,
        agent_type,
        current_planning_run: current_planning_run_id.map(AgentRunId::from_uuid),
        current_run: current_run_id.map(AgentRunId::from_uuid),
        parent_id: parent_id.map(TaskId::from_uuid),
        order_index,
        error_message,
        queued_instructions: serde_json::from_value::<Vec<QueuedInstruction>>(
            queued_instructions,
        )
        .map_err(TaskRepositoryError::persistence)?,
        revision: to_u64(revision)?,
        created_at,
        updated_at,
        completed_at,
        archived_at,
    };
    Ok(Task::from_persisted(data))
}
