use std::sync::Arc;

use chrono::Utc;
use sprout_core::CareJob;
use sprout_garden::{CareEngine, GardenError};
use sprout_scheduler::{Job, JobStatus, SchedulerHandle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};

/// Drain fired jobs, running at most `workers` of them at once.
///
/// Store access is blocking SQLite, so each job runs on the blocking pool.
/// Returns when the engine side of the channel is dropped.
pub async fn run_workers(
    mut fired_rx: mpsc::Receiver<Job>,
    engine: Arc<CareEngine>,
    scheduler: SchedulerHandle,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    info!(workers = workers.max(1), "worker pool started");

    while let Some(job) = fired_rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let engine = Arc::clone(&engine);
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let job_id = job.id.clone();
            let runner = scheduler.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || execute(&engine, &runner, &job)).await {
                error!(%job_id, "worker task panicked: {e}");
                // Hand the job to the retry policy instead of leaving it `running`.
                if let Err(e) = scheduler.fail(&job_id, "worker panicked", Utc::now()) {
                    error!(%job_id, "could not record job outcome: {e}");
                }
            }
        });
    }

    // Let in-flight jobs finish before reporting the pool as stopped.
    let _ = permits.acquire_many(workers.max(1) as u32).await;
    info!("worker pool stopped");
}

/// Run one fired job and record its outcome with the scheduler.
///
/// Failures never propagate further: they are logged and handed to the
/// scheduler's retry policy.
pub fn execute(engine: &CareEngine, scheduler: &SchedulerHandle, job: &Job) -> Option<JobStatus> {
    debug!(job_id = %job.id, name = %job.name, "executing job");
    let result = CareJob::from_action(&job.action)
        .map_err(GardenError::from)
        .and_then(|payload| engine.run(&payload));

    let recorded = match result {
        Ok(()) => scheduler.complete(&job.id, Utc::now()),
        Err(e) => {
            error!(job_id = %job.id, name = %job.name, code = e.code(), "job failed: {e}");
            scheduler.fail(&job.id, &e.to_string(), Utc::now())
        }
    };
    match recorded {
        Ok(status) => Some(status),
        Err(e) => {
            error!(job_id = %job.id, "could not record job outcome: {e}");
            None
        }
    }
}
