//! Diesel schema for agent run persistence.

diesel::table! {
    /// Agent run history, one row per dispatch.
    agent_runs (id) {
        /// Internal run identifier.
        id -> Uuid,
        /// Owning task identifier.
        task_id -> Uuid,
        /// Planning or implementation.
        #[max_length = 20]
        run_type -> Varchar,
        /// Identifier assigned by the external runner.
        #[max_length = 255]
        external_run_id -> Nullable<Varchar>,
        /// Run lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Whether the run was abandoned by cancellation.
        abandoned -> Bool,
        /// Follow-up instructions.
        instructions -> Nullable<Text>,
        /// Pull request URL.
        #[max_length = 2048]
        pr_url -> Nullable<Varchar>,
        /// Pull request number.
        pr_number -> Nullable<Int8>,
        /// Pull request status.
        #[max_length = 20]
        pr_status -> Nullable<Varchar>,
        /// Runner summary.
        summary -> Nullable<Text>,
        /// Failure message.
        error_message -> Nullable<Text>,
        /// Last applied runner sequence number.
        last_sequence -> Nullable<Int8>,
        /// Digest of the last applied report.
        #[max_length = 64]
        last_report_digest -> Nullable<Varchar>,
        /// Creation timestamp.
        started_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Terminal timestamp.
        finished_at -> Nullable<Timestamptz>,
    }
}
