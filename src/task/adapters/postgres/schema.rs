//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task records with plan, run pointers, and queued instructions.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Owning workspace.
        workspace_id -> Uuid,
        /// Task title.
        title -> Text,
        /// Optional description.
        description -> Nullable<Text>,
        /// Optional original prompt.
        prompt -> Nullable<Text>,
        /// Generated plan text.
        plan -> Nullable<Text>,
        /// When the plan was stored.
        plan_generated_at -> Nullable<Timestamptz>,
        /// Plan progress.
        #[max_length = 20]
        plan_status -> Nullable<Varchar>,
        /// Board column.
        #[max_length = 20]
        status -> Varchar,
        /// Assignee kind.
        #[max_length = 20]
        assignee -> Nullable<Varchar>,
        /// Preferred agent flavour.
        #[max_length = 100]
        agent_type -> Nullable<Varchar>,
        /// Current planning run pointer.
        current_planning_run_id -> Nullable<Uuid>,
        /// Current implementation run pointer.
        current_run_id -> Nullable<Uuid>,
        /// Parent task for subtasks.
        parent_id -> Nullable<Uuid>,
        /// Manual ranking.
        order_index -> Int8,
        /// User-visible failure message.
        error_message -> Nullable<Text>,
        /// Instructions queued behind the active run.
        queued_instructions -> Jsonb,
        /// Optimistic concurrency revision.
        revision -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Archive timestamp.
        archived_at -> Nullable<Timestamptz>,
    }
}
