//! `PostgreSQL` store implementation for job orchestration.

use super::{
    models::{JobChangeset, JobRow, NewRunLeaseRow, TaskChangeset, TaskEventRow, TaskRow},
    schema::{conductor_jobs, conductor_run_leases, conductor_task_events, conductor_tasks},
};
use crate::job::{
    domain::{
        BranchName, Job, JobId, JobStatus, LeaseHolder, PersistedJobData, PersistedTaskData,
        PersistedTaskEventData, RunId, Task, TaskEvent, TaskEventId, TaskEventKind, TaskId,
        TaskRole, TaskStatus,
    },
    ports::{JobStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

/// `PostgreSQL` connection pool type used by the job store.
pub type JobPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed job store.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: JobPgPool,
}

impl PostgresJobStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: JobPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let job_id = job.id();
        let row = job_to_row(job);
        self.run_blocking(move |connection| {
            diesel::insert_into(conductor_jobs::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateJob(job_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_job(&self, job: &Job) -> StoreResult<()> {
        let job_id = job.id();
        let changeset = job_changeset(job);
        self.run_blocking(move |connection| {
            let updated = diesel::update(conductor_jobs::table.find(job_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(StoreError::persistence)?;
            if updated == 0 {
                return Err(StoreError::JobNotFound(job_id));
            }
            Ok(())
        })
        .await
    }

    async fn update_job_if_status(&self, job: &Job, expected: JobStatus) -> StoreResult<bool> {
        let job_id = job.id();
        let changeset = job_changeset(job);
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                conductor_jobs::table
                    .filter(conductor_jobs::id.eq(job_id.into_inner()))
                    .filter(conductor_jobs::status.eq(expected.as_str())),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(StoreError::persistence)?;
            if updated == 1 {
                return Ok(true);
            }
            let exists = diesel::select(diesel::dsl::exists(
                conductor_jobs::table.find(job_id.into_inner()),
            ))
            .get_result::<bool>(connection)
            .map_err(StoreError::persistence)?;
            if exists {
                Ok(false)
            } else {
                Err(StoreError::JobNotFound(job_id))
            }
        })
        .await
    }

    async fn find_job(&self, id: JobId) -> StoreResult<Option<Job>> {
        self.run_blocking(move |connection| {
            let row = conductor_jobs::table
                .find(id.into_inner())
                .select(JobRow::as_select())
                .first::<JobRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(row_to_job).transpose()
        })
        .await
    }

    async fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<Job>> {
        self.run_blocking(move |connection| {
            let mut query = conductor_jobs::table
                .select(JobRow::as_select())
                .order(conductor_jobs::created_at.desc())
                .into_boxed();
            if let Some(wanted) = status {
                query = query.filter(conductor_jobs::status.eq(wanted.as_str()));
            }
            let rows = query
                .load::<JobRow>(connection)
                .map_err(StoreError::persistence)?;
            rows.into_iter().map(row_to_job).collect()
        })
        .await
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let Some(first) = tasks.first() else {
            return Ok(());
        };
        let first_job = first.job_id();
        let first_task = first.id();
        let rows = tasks
            .iter()
            .map(task_to_row)
            .collect::<StoreResult<Vec<_>>>()?;

        self.run_blocking(move |connection| {
            diesel::insert_into(conductor_tasks::table)
                .values(&rows)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        StoreError::JobNotFound(first_job)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateTask(first_task)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let changeset = task_changeset(task)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(conductor_tasks::table.find(task_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(StoreError::persistence)?;
            if updated == 0 {
                return Err(StoreError::TaskNotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = conductor_tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn tasks_for_job(&self, job_id: JobId) -> StoreResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = conductor_tasks::table
                .filter(conductor_tasks::job_id.eq(job_id.into_inner()))
                .order((
                    conductor_tasks::created_at.asc(),
                    conductor_tasks::position.asc(),
                ))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(StoreError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn append_event(&self, event: &TaskEvent) -> StoreResult<()> {
        let task_id = event.task_id();
        let row = TaskEventRow {
            id: event.id().into_inner(),
            task_id: task_id.into_inner(),
            event_type: event.kind().as_str().to_owned(),
            metadata: event.metadata().clone(),
            created_at: event.created_at(),
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(conductor_task_events::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        StoreError::TaskNotFound(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn events_for_task(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>> {
        self.run_blocking(move |connection| {
            let rows = conductor_task_events::table
                .filter(conductor_task_events::task_id.eq(task_id.into_inner()))
                .order(conductor_task_events::created_at.asc())
                .select(TaskEventRow::as_select())
                .load::<TaskEventRow>(connection)
                .map_err(StoreError::persistence)?;
            rows.into_iter().map(row_to_event).collect()
        })
        .await
    }

    async fn acquire_run_lease(
        &self,
        job_id: JobId,
        holder: LeaseHolder,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let row = NewRunLeaseRow {
            job_id: job_id.into_inner(),
            holder: holder.into_inner(),
            renewed_at: now,
        };
        self.run_blocking(move |connection| {
            connection
                .transaction::<bool, DieselError, _>(|tx| {
                    let current = conductor_run_leases::table
                        .find(row.job_id)
                        .select((
                            conductor_run_leases::holder,
                            conductor_run_leases::renewed_at,
                        ))
                        .for_update()
                        .first::<(Uuid, DateTime<Utc>)>(tx)
                        .optional()?;
                    match current {
                        None => {
                            let inserted = diesel::insert_into(conductor_run_leases::table)
                                .values(&row)
                                .on_conflict_do_nothing()
                                .execute(tx)?;
                            Ok(inserted == 1)
                        }
                        Some((owner, renewed_at))
                            if owner == row.holder || renewed_at < stale_before =>
                        {
                            diesel::update(conductor_run_leases::table.find(row.job_id))
                                .set((
                                    conductor_run_leases::holder.eq(row.holder),
                                    conductor_run_leases::renewed_at.eq(row.renewed_at),
                                ))
                                .execute(tx)?;
                            Ok(true)
                        }
                        Some(_) => Ok(false),
                    }
                })
                .map_err(StoreError::persistence)
        })
        .await
    }

    async fn release_run_lease(&self, job_id: JobId, holder: LeaseHolder) -> StoreResult<()> {
        self.run_blocking(move |connection| {
            diesel::delete(
                conductor_run_leases::table
                    .filter(conductor_run_leases::job_id.eq(job_id.into_inner()))
                    .filter(conductor_run_leases::holder.eq(holder.into_inner())),
            )
            .execute(connection)
            .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }
}

fn job_to_row(job: &Job) -> JobRow {
    JobRow {
        id: job.id().into_inner(),
        goal: job.goal().to_owned(),
        repository: job.repository().to_owned(),
        base_branch: job.base_branch().as_str().to_owned(),
        status: job.status().as_str().to_owned(),
        pull_request_url: job.pull_request_url().map(str::to_owned),
        branch: job.branch().map(|branch| branch.as_str().to_owned()),
        created_at: job.created_at(),
        updated_at: job.updated_at(),
        completed_at: job.completed_at(),
        error_message: job.error_message().map(str::to_owned),
    }
}

fn job_changeset(job: &Job) -> JobChangeset {
    JobChangeset {
        status: job.status().as_str().to_owned(),
        pull_request_url: job.pull_request_url().map(str::to_owned),
        branch: job.branch().map(|branch| branch.as_str().to_owned()),
        updated_at: job.updated_at(),
        completed_at: job.completed_at(),
        error_message: job.error_message().map(str::to_owned),
    }
}

fn row_to_job(row: JobRow) -> StoreResult<Job> {
    let JobRow {
        id,
        goal,
        repository,
        base_branch,
        status,
        pull_request_url,
        branch,
        created_at,
        updated_at,
        completed_at,
        error_message,
    } = row;

    let data = PersistedJobData {
        id: JobId::from_uuid(id),
        goal,
        repository,
        base_branch: BranchName::new(base_branch).map_err(StoreError::invalid_persisted_data)?,
        status: JobStatus::try_from(status.as_str()).map_err(StoreError::invalid_persisted_data)?,
        pull_request_url,
        branch: branch
            .map(BranchName::new)
            .transpose()
            .map_err(StoreError::invalid_persisted_data)?,
        created_at,
        updated_at,
        completed_at,
        error_message,
    };
    Ok(Job::from_persisted(data))
}

fn to_column_int(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(StoreError::persistence)
}

fn from_column_int(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(StoreError::invalid_persisted_data)
}

fn task_to_row(task: &Task) -> StoreResult<TaskRow> {
    Ok(TaskRow {
        id: task.id().into_inner(),
        job_id: task.job_id().into_inner(),
        position: to_column_int(task.position())?,
        title: task.title().to_owned(),
        objective: task.objective().to_owned(),
        role: task.role().as_str().to_owned(),
        status: task.status().as_str().to_owned(),
        dependencies: serde_json::to_value(task.dependencies())
            .map_err(StoreError::persistence)?,
        files: serde_json::to_value(task.files()).map_err(StoreError::persistence)?,
        definition_of_done: task.definition_of_done().map(str::to_owned),
        run_id: task.run_id().map(|run| run.as_str().to_owned()),
        attempt_count: to_column_int(task.attempt_count())?,
        max_attempts: to_column_int(task.max_attempts())?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
        error_message: task.error_message().map(str::to_owned),
    })
}

fn task_changeset(task: &Task) -> StoreResult<TaskChangeset> {
    Ok(TaskChangeset {
        status: task.status().as_str().to_owned(),
        run_id: task.run_id().map(|run| run.as_str().to_owned()),
        attempt_count: to_column_int(task.attempt_count())?,
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
        error_message: task.error_message().map(str::to_owned),
    })
}

fn row_to_task(row: TaskRow) -> StoreResult<Task> {
    let TaskRow {
        id,
        job_id,
        position,
        title,
        objective,
        role,
        status,
        dependencies,
        files,
        definition_of_done,
        run_id,
        attempt_count,
        max_attempts,
        created_at,
        updated_at,
        completed_at,
        error_message,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        job_id: JobId::from_uuid(job_id),
        position: from_column_int(position)?,
        title,
        objective,
        role: TaskRole::try_from(role.as_str()).map_err(StoreError::invalid_persisted_data)?,
        status: TaskStatus::try_from(status.as_str())
            .map_err(StoreError::invalid_persisted_data)?,
        dependencies: serde_json::from_value(dependencies)
            .map_err(StoreError::invalid_persisted_data)?,
        files: serde_json::from_value(files).map_err(StoreError::invalid_persisted_data)?,
        definition_of_done,
        run_id: run_id
            .map(RunId::new)
            .transpose()
            .map_err(StoreError::invalid_persisted_data)?,
        attempt_count: from_column_int(attempt_count)?,
        max_attempts: from_column_int(max_attempts)?,
        created_at,
        updated_at,
        completed_at,
        error_message,
    };
    Ok(Task::from_persisted(data))
}

fn row_to_event(row: TaskEventRow) -> StoreResult<TaskEvent> {
    let data = PersistedTaskEventData {
        id: TaskEventId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        kind: TaskEventKind::try_from(row.event_type.as_str())
            .map_err(StoreError::invalid_persisted_data)?,
        metadata: row.metadata,
        created_at: row.created_at,
    };
    Ok(TaskEvent::from_persisted(data))
}
