//! Diesel schema for job orchestration persistence.

diesel::table! {
    /// Submitted jobs.
    conductor_jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Goal text.
        goal -> Text,
        /// Target repository reference.
        #[max_length = 255]
        repository -> Varchar,
        /// Base integration branch.
        #[max_length = 200]
        base_branch -> Varchar,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Pull request URL, if one was opened.
        pull_request_url -> Nullable<Text>,
        /// Work branch, if one was created.
        #[max_length = 200]
        branch -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Terminal-status timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Most recent failure cause.
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    /// Tasks planned for a job.
    conductor_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning job.
        job_id -> Uuid,
        /// Creation order within the job.
        position -> Int4,
        /// Short title.
        title -> Text,
        /// Objective text.
        objective -> Text,
        /// Assigned role.
        #[max_length = 50]
        role -> Varchar,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Dependency task identifiers as a JSON array.
        dependencies -> Jsonb,
        /// File hints as a JSON array.
        files -> Jsonb,
        /// Completion criteria.
        definition_of_done -> Nullable<Text>,
        /// External run reference.
        #[max_length = 255]
        run_id -> Nullable<Varchar>,
        /// Attempts consumed.
        attempt_count -> Int4,
        /// Attempts allowed.
        max_attempts -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Terminal-status timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Most recent failure cause.
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    /// Append-only task audit events.
    conductor_task_events (id) {
        /// Event identifier.
        id -> Uuid,
        /// Task the event belongs to.
        task_id -> Uuid,
        /// Event kind.
        #[max_length = 50]
        event_type -> Varchar,
        /// Free-form metadata payload.
        metadata -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per job currently driven by an orchestration loop.
    conductor_run_leases (job_id) {
        /// Leased job.
        job_id -> Uuid,
        /// Loop instance holding the lease.
        holder -> Uuid,
        /// Last claim or renewal by the holder.
        renewed_at -> Timestamptz,
    }
}

diesel::joinable!(conductor_tasks -> conductor_jobs (job_id));
diesel::joinable!(conductor_task_events -> conductor_tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(
    conductor_jobs,
    conductor_tasks,
    conductor_task_events,
    conductor_run_leases,
);
