use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::{error::Result, handle::SchedulerHandle, types::Job};

/// Polling loop: claims due jobs and forwards them to the worker pool.
pub struct SchedulerEngine {
    handle: SchedulerHandle,
    fired_tx: mpsc::Sender<Job>,
    poll_interval: Duration,
}

impl SchedulerEngine {
    /// `fired_tx` is fed with `try_send` so the tick loop never stalls on a
    /// busy worker pool.
    pub fn new(handle: SchedulerHandle, fired_tx: mpsc::Sender<Job>, poll_interval: Duration) -> Self {
        Self {
            handle,
            fired_tx,
            poll_interval,
        }
    }

    /// Main event loop. Polls until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_ms = self.poll_interval.as_millis() as u64, "scheduler engine started");
        if let Err(e) = self.handle.recover_orphaned() {
            error!("orphaned-job recovery failed: {e}");
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Claim everything due now and dispatch it. Returns how many jobs were handed off.
    pub fn tick(&self) -> Result<usize> {
        let mut sent = 0;
        for job in self.handle.claim_due(Utc::now())? {
            let id = job.id.clone();
            match self.fired_tx.try_send(job) {
                Ok(()) => sent += 1,
                Err(e) => {
                    // Un-claim so the next tick picks it up again.
                    warn!(job_id = %id, "worker channel unavailable ({e}); job re-queued");
                    if let Err(e) = self.handle.release(&id) {
                        error!(job_id = %id, "could not release claimed job: {e}");
                    }
                }
            }
        }
        Ok(sent)
    }
}
