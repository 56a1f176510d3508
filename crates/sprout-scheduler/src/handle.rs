use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use sprout_core::{CareJob, JobScheduler};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    schedule::{first_run, next_run_after, retry_delay, timestamp},
    types::{Job, JobStatus, Schedule},
};

const JOB_COLUMNS: &str = "id, job_key, name, schedule, action, status, last_run, next_run,
                           run_count, attempts, last_error, created_at, updated_at";

/// How failed attempts are re-delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before a one-shot job is given up on.
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_secs: 15,
        }
    }
}

impl From<&sprout_core::config::SchedulerConfig> for RetryPolicy {
    fn from(cfg: &sprout_core::config::SchedulerConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay_secs: cfg.retry_base_secs,
        }
    }
}

/// Shared handle over the `jobs` table.
///
/// Cloned into the engine loop, the worker pool and the HTTP layer; all clones
/// serialise on one `Connection`.
#[derive(Clone)]
pub struct SchedulerHandle {
    conn: Arc<Mutex<Connection>>,
    retry: RetryPolicy,
}

impl SchedulerHandle {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SchedulerError::LockPoisoned)
    }

    /// Persist a one-shot or recurring job without a registration key.
    pub fn add_job(&self, name: &str, schedule: Schedule, action: &str) -> Result<Job> {
        let now = Utc::now();
        let now_str = timestamp(now);
        let next = timestamp(first_run(&schedule, now)?);
        let id = Uuid::new_v4().to_string();
        let schedule_json = serde_json::to_string(&schedule)?;

        self.db()?.execute(
            "INSERT INTO jobs
             (id, job_key, name, schedule, action, status, last_run, next_run,
              run_count, attempts, last_error, created_at, updated_at)
             VALUES (?1,NULL,?2,?3,?4,'pending',NULL,?5,0,0,NULL,?6,?6)",
            rusqlite::params![id, name, schedule_json, action, next, now_str],
        )?;
        debug!(job_id = %id, %name, next_run = %next, "job added");

        Ok(Job {
            id,
            key: None,
            name: name.to_string(),
            schedule,
            action: action.to_string(),
            status: JobStatus::Pending,
            last_run: None,
            next_run: Some(next),
            run_count: 0,
            attempts: 0,
            last_error: None,
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    /// Insert or replace the recurring registration stored under `key`.
    ///
    /// Re-registering keeps the row id and run history but swaps the name,
    /// cron expression and payload. `next_run` is only recomputed when the
    /// expression changed, so a run that fell due while the process was down
    /// still fires on the first tick.
    pub fn upsert_recurring(&self, key: &str, name: &str, expression: &str, action: &str) -> Result<Job> {
        let schedule = Schedule::Cron {
            expression: expression.to_string(),
        };
        let now = Utc::now();
        let now_str = timestamp(now);
        let next = timestamp(first_run(&schedule, now)?);
        let schedule_json = serde_json::to_string(&schedule)?;

        let db = self.db()?;
        db.execute(
            "INSERT INTO jobs
             (id, job_key, name, schedule, action, status, last_run, next_run,
              run_count, attempts, last_error, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,'pending',NULL,?6,0,0,NULL,?7,?7)
             ON CONFLICT(job_key) DO UPDATE SET
                name = excluded.name,
                schedule = excluded.schedule,
                action = excluded.action,
                next_run = CASE WHEN jobs.schedule = excluded.schedule
                                THEN jobs.next_run ELSE excluded.next_run END,
                updated_at = excluded.updated_at",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                key,
                name,
                schedule_json,
                action,
                next,
                now_str
            ],
        )?;
        let job = db.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_key = ?1"),
            [key],
            row_to_job,
        )?;
        info!(job_id = %job.id, %key, %expression, next_run = ?job.next_run, "recurring job registered");
        Ok(job)
    }

    /// Remove a job by ID. Returns `JobNotFound` if no row is deleted.
    pub fn remove_job(&self, id: &str) -> Result<()> {
        let n = self.db()?.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job removed");
        Ok(())
    }

    pub fn get_job(&self, id: &str) -> Result<Job> {
        let db = self.db()?;
        load_job(&db, id)
    }

    /// Return all known jobs ordered by creation time.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let db = self.db()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at, id"
        ))?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    /// Move every pending job due at `now` to `running` and return it.
    ///
    /// Each row flips with a guarded UPDATE so a second process polling the
    /// same file cannot claim it twice.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let now_str = timestamp(now);
        let mut db = self.db()?;
        let tx = db.transaction()?;

        let due: Vec<Job> = {
            let mut stmt = tx.prepare_cached(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE status = 'pending' AND next_run IS NOT NULL AND next_run <= ?1
                 ORDER BY next_run, created_at"
            ))?;
            let rows = stmt
                .query_map([&now_str], row_to_job)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut claimed = Vec::with_capacity(due.len());
        for mut job in due {
            let n = tx.execute(
                "UPDATE jobs SET status = 'running', last_run = ?1, updated_at = ?1
                 WHERE id = ?2 AND status = 'pending'",
                rusqlite::params![now_str, job.id],
            )?;
            if n == 1 {
                job.status = JobStatus::Running;
                job.last_run = Some(now_str.clone());
                job.updated_at = now_str.clone();
                claimed.push(job);
            }
        }
        tx.commit()?;
        Ok(claimed)
    }

    /// Hand a claimed job back to the queue untouched (worker channel full).
    pub fn release(&self, id: &str) -> Result<()> {
        let n = self.db()?.execute(
            "UPDATE jobs SET status = 'pending' WHERE id = ?1 AND status = 'running'",
            [id],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Reset jobs left `running` by a previous process so they are redelivered.
    pub fn recover_orphaned(&self) -> Result<usize> {
        let now = timestamp(Utc::now());
        let n = self.db()?.execute(
            "UPDATE jobs SET status = 'pending', updated_at = ?1 WHERE status = 'running'",
            [&now],
        )?;
        if n > 0 {
            warn!(count = n, "re-queued jobs interrupted by a restart");
        }
        Ok(n)
    }

    /// Record a successful run. Recurring jobs go back to `pending` at their
    /// next cron occurrence; one-shot jobs become `completed`.
    pub fn complete(&self, id: &str, now: DateTime<Utc>) -> Result<JobStatus> {
        let now_str = timestamp(now);
        let db = self.db()?;
        let job = load_job(&db, id)?;

        let (status, next) = match next_run_after(&job.schedule, now)? {
            Some(next) => (JobStatus::Pending, Some(timestamp(next))),
            None => (JobStatus::Completed, None),
        };
        db.execute(
            "UPDATE jobs SET status = ?1, next_run = ?2, run_count = run_count + 1,
              attempts = 0, last_error = NULL, updated_at = ?3
             WHERE id = ?4",
            rusqlite::params![status.to_string(), next, now_str, id],
        )?;
        debug!(job_id = %id, name = %job.name, %status, "job completed");
        Ok(status)
    }

    /// Record a failed attempt and decide on re-delivery.
    ///
    /// Retries back off exponentially until the policy's attempt budget is
    /// spent. After that a one-shot job is `failed`; a recurring job resets
    /// and waits for its next cron occurrence.
    pub fn fail(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<JobStatus> {
        let now_str = timestamp(now);
        let db = self.db()?;
        let job = load_job(&db, id)?;
        let attempts = job.attempts + 1;

        let (status, next, attempts) = if attempts < self.retry.max_attempts {
            let at = now + retry_delay(self.retry.base_delay_secs, attempts);
            (JobStatus::Pending, Some(timestamp(at)), attempts)
        } else {
            match next_run_after(&job.schedule, now)? {
                Some(next) => (JobStatus::Pending, Some(timestamp(next)), 0),
                None => (JobStatus::Failed, None, attempts),
            }
        };

        db.execute(
            "UPDATE jobs SET status = ?1, next_run = ?2, attempts = ?3,
              last_error = ?4, updated_at = ?5
             WHERE id = ?6",
            rusqlite::params![status.to_string(), next, attempts, error, now_str, id],
        )?;
        warn!(job_id = %id, name = %job.name, attempts, %status, next_run = ?next, "job attempt failed: {error}");
        Ok(status)
    }
}

impl JobScheduler for SchedulerHandle {
    fn enqueue_now(&self, job: &CareJob) -> sprout_core::Result<String> {
        let schedule = Schedule::Once { at: Utc::now() };
        Ok(self.add_job(job.name(), schedule, &job.to_action()?)?.id)
    }

    fn enqueue_after(&self, job: &CareJob, delay: Duration) -> sprout_core::Result<String> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| sprout_core::SproutError::Scheduler(format!("delay out of range: {e}")))?;
        let schedule = Schedule::Once {
            at: Utc::now() + delay,
        };
        Ok(self.add_job(job.name(), schedule, &job.to_action()?)?.id)
    }

    fn register_recurring(&self, key: &str, job: &CareJob, cron: &str) -> sprout_core::Result<()> {
        self.upsert_recurring(key, job.name(), cron, &job.to_action()?)?;
        Ok(())
    }
}

fn load_job(db: &Connection, id: &str) -> Result<Job> {
    db.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
        [id],
        row_to_job,
    )
    .optional()?
    .ok_or_else(|| SchedulerError::JobNotFound { id: id.to_string() })
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    let schedule_json: String = row.get(3)?;
    let schedule: Schedule = serde_json::from_str(&schedule_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let status_str: String = row.get(5)?;
    let status: JobStatus = status_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into())
    })?;

    Ok(Job {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        schedule,
        action: row.get(4)?,
        status,
        last_run: row.get(6)?,
        next_run: row.get(7)?,
        run_count: row.get(8)?,
        attempts: row.get(9)?,
        last_error: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::PlantId;

    fn handle() -> SchedulerHandle {
        SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn enqueue_now_is_due_immediately() {
        let h = handle();
        let id = h
            .enqueue_now(&CareJob::CreatePlant {
                plant_type: "Fern".to_string(),
            })
            .unwrap();

        let claimed = h.claim_due(Utc::now()).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, id);
        assert_eq!(claimed[0].name, "create_plant");
        assert_eq!(claimed[0].status, JobStatus::Running);

        // Claimed rows are not handed out twice.
        assert!(h.claim_due(Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn enqueue_after_waits_for_the_delay() {
        let h = handle();
        let job = CareJob::Fertilize {
            plant_id: PlantId(1),
        };
        h.enqueue_after(&job, Duration::from_secs(2 * 60 * 60)).unwrap();

        assert!(h.claim_due(Utc::now()).unwrap().is_empty());
        let later = Utc::now() + chrono::Duration::hours(2) + chrono::Duration::seconds(1);
        let claimed = h.claim_due(later).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(CareJob::from_action(&claimed[0].action).unwrap(), job);
    }

    #[test]
    fn completing_a_one_shot_job_finishes_it() {
        let h = handle();
        let id = h.enqueue_now(&CareJob::WaterAll).unwrap();
        h.claim_due(Utc::now()).unwrap();

        assert_eq!(h.complete(&id, Utc::now()).unwrap(), JobStatus::Completed);
        let job = h.get_job(&id).unwrap();
        assert_eq!(job.run_count, 1);
        assert_eq!(job.next_run, None);
    }

    #[test]
    fn recurring_registration_is_an_upsert() {
        let h = handle();
        h.register_recurring("health", &CareJob::HealthCheck, "0 * * * *")
            .unwrap();
        let first = h.list_jobs().unwrap();
        assert_eq!(first.len(), 1);

        h.register_recurring("health", &CareJob::HealthCheck, "*/30 * * * *")
            .unwrap();
        let jobs = h.list_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, first[0].id);
        assert_eq!(jobs[0].key.as_deref(), Some("health"));
        assert_eq!(
            jobs[0].schedule,
            Schedule::Cron {
                expression: "*/30 * * * *".to_string()
            }
        );
    }

    #[test]
    fn overdue_recurring_job_survives_reregistration() {
        let h = handle();
        let job = h
            .upsert_recurring("water", "water_all_plants", "0 0 * * *", r#"{"job":"water_all"}"#)
            .unwrap();
        // Midnight passed while the process was down.
        let overdue = timestamp(Utc::now() - chrono::Duration::minutes(30));
        h.db()
            .unwrap()
            .execute("UPDATE jobs SET next_run = ?1 WHERE id = ?2", [&overdue, &job.id])
            .unwrap();

        let again = h
            .upsert_recurring("water", "water_all_plants", "0 0 * * *", r#"{"job":"water_all"}"#)
            .unwrap();
        assert_eq!(again.next_run.as_deref(), Some(overdue.as_str()));

        let claimed = h.claim_due(Utc::now()).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, job.id);
    }

    #[test]
    fn changed_cadence_recomputes_next_run() {
        let h = handle();
        let job = h
            .upsert_recurring("sun", "sunlight_all_plants", "0 */4 * * *", r#"{"job":"sunlight_all"}"#)
            .unwrap();
        let overdue = timestamp(Utc::now() - chrono::Duration::minutes(30));
        h.db()
            .unwrap()
            .execute("UPDATE jobs SET next_run = ?1 WHERE id = ?2", [&overdue, &job.id])
            .unwrap();

        let moved = h
            .upsert_recurring("sun", "sunlight_all_plants", "0 */2 * * *", r#"{"job":"sunlight_all"}"#)
            .unwrap();
        assert!(moved.next_run.unwrap() > timestamp(Utc::now()));
        assert!(h.claim_due(Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn invalid_cron_is_rejected_at_registration() {
        let h = handle();
        assert!(h
            .register_recurring("bad", &CareJob::WaterAll, "every day")
            .is_err());
        assert!(h.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn recurring_job_returns_to_pending_after_completion() {
        let h = handle();
        let job = h
            .upsert_recurring("sun", "sunlight_all_plants", "0 */4 * * *", r#"{"job":"sunlight_all"}"#)
            .unwrap();
        let fire_at = Utc::now() + chrono::Duration::hours(5);
        let claimed = h.claim_due(fire_at).unwrap();
        assert_eq!(claimed.len(), 1);

        assert_eq!(h.complete(&job.id, fire_at).unwrap(), JobStatus::Pending);
        let after = h.get_job(&job.id).unwrap();
        assert_eq!(after.run_count, 1);
        assert!(after.next_run.unwrap() > timestamp(fire_at));
    }

    #[test]
    fn failures_back_off_then_give_up() {
        let h = handle().with_retry_policy(RetryPolicy {
            max_attempts: 2,
            base_delay_secs: 10,
        });
        let id = h.enqueue_now(&CareJob::WaterAll).unwrap();
        let now = Utc::now();
        h.claim_due(now).unwrap();

        assert_eq!(h.fail(&id, "disk I/O error", now).unwrap(), JobStatus::Pending);
        let job = h.get_job(&id).unwrap();
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error.as_deref(), Some("disk I/O error"));
        assert_eq!(job.next_run, Some(timestamp(now + chrono::Duration::seconds(10))));

        // Not due until the backoff has elapsed.
        assert!(h.claim_due(now).unwrap().is_empty());
        let retry_at = now + chrono::Duration::seconds(10);
        assert_eq!(h.claim_due(retry_at).unwrap().len(), 1);

        assert_eq!(h.fail(&id, "disk I/O error", retry_at).unwrap(), JobStatus::Failed);
        assert!(h.claim_due(retry_at + chrono::Duration::days(1)).unwrap().is_empty());
    }

    #[test]
    fn recurring_job_never_fails_permanently() {
        let h = handle().with_retry_policy(RetryPolicy {
            max_attempts: 1,
            base_delay_secs: 10,
        });
        let job = h
            .upsert_recurring("water", "water_all_plants", "0 0 * * *", r#"{"job":"water_all"}"#)
            .unwrap();
        let now = Utc::now();
        assert_eq!(h.fail(&job.id, "locked", now).unwrap(), JobStatus::Pending);
        assert_eq!(h.get_job(&job.id).unwrap().attempts, 0);
    }

    #[test]
    fn orphaned_running_jobs_are_redelivered() {
        let h = handle();
        let id = h.enqueue_now(&CareJob::HealthCheck).unwrap();
        h.claim_due(Utc::now()).unwrap();

        // Simulated crash: nobody reported back.
        assert_eq!(h.recover_orphaned().unwrap(), 1);
        let claimed = h.claim_due(Utc::now()).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, id);
    }

    #[test]
    fn release_puts_job_back() {
        let h = handle();
        let id = h.enqueue_now(&CareJob::SunlightAll).unwrap();
        h.claim_due(Utc::now()).unwrap();
        h.release(&id).unwrap();
        assert_eq!(h.get_job(&id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn remove_unknown_job_is_not_found() {
        let h = handle();
        assert!(matches!(
            h.remove_job("nope"),
            Err(SchedulerError::JobNotFound { .. })
        ));
    }
}
