use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sprout_core::{config::CareConfig, CareJob, JobScheduler, PlantId};
use tracing::{info, instrument, warn};

use crate::alert::AlertSink;
use crate::error::Result;
use crate::lifecycle::{self, evaluate_health};
use crate::notify::{NotificationEvaluator, NotificationOutcome};
use crate::store::PlantStore;
use crate::types::Plant;

/// Summary of one batch job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Plants in the snapshot.
    pub processed: usize,
    /// Plants whose stored values changed.
    pub changed: usize,
    /// Follow-up jobs handed to the scheduler.
    pub scheduled: usize,
}

/// The plant lifecycle engine.
///
/// Each batch job follows the same shape: snapshot every plant, map each one
/// through a pure rule from [`lifecycle`], persist the result in one batch.
pub struct CareEngine {
    store: Arc<dyn PlantStore>,
    scheduler: Arc<dyn JobScheduler>,
    notifier: NotificationEvaluator,
    notification_delay: Duration,
}

impl CareEngine {
    pub fn new(
        store: Arc<dyn PlantStore>,
        scheduler: Arc<dyn JobScheduler>,
        alerts: Arc<dyn AlertSink>,
        care: &CareConfig,
    ) -> Self {
        Self {
            notifier: NotificationEvaluator::new(Arc::clone(&store), alerts),
            store,
            scheduler,
            notification_delay: care.notification_delay(),
        }
    }

    /// Execute one scheduled job payload.
    pub fn run(&self, job: &CareJob) -> Result<()> {
        match job {
            CareJob::CreatePlant { plant_type } => {
                self.create_plant(plant_type)?;
            }
            CareJob::WaterAll => {
                self.water_all()?;
            }
            CareJob::SunlightAll => {
                self.sunlight_all()?;
            }
            CareJob::HealthCheck => {
                self.health_check()?;
            }
            CareJob::Fertilize { plant_id } => {
                self.apply_fertilizer(*plant_id)?;
            }
            CareJob::NotifyIfUnhealthy { plant_id } => {
                self.notify_if_unhealthy(*plant_id)?;
            }
        }
        Ok(())
    }

    /// Plant a new seed with default vitals.
    pub fn create_plant(&self, plant_type: &str) -> Result<PlantId> {
        let id = self
            .store
            .insert(&lifecycle::seedling(plant_type, Utc::now()))?;
        info!(plant_id = %id, %plant_type, "new plant created");
        Ok(id)
    }

    /// +10 water for every plant, clamped at 100.
    #[instrument(skip(self))]
    pub fn water_all(&self) -> Result<BatchReport> {
        self.apply_to_all("water", lifecycle::water)
    }

    /// +5 growth for every plant.
    #[instrument(skip(self))]
    pub fn sunlight_all(&self) -> Result<BatchReport> {
        self.apply_to_all("sunlight", lifecycle::give_sunlight)
    }

    fn apply_to_all(&self, effect: &str, rule: fn(Plant) -> Plant) -> Result<BatchReport> {
        let plants = self.store.list_all()?;
        if plants.is_empty() {
            info!(%effect, "no plants to care for");
            return Ok(BatchReport::default());
        }

        let processed = plants.len();
        let mut changed = 0;
        let updated: Vec<Plant> = plants
            .into_iter()
            .map(|before| {
                let after = rule(before.clone());
                if after != before {
                    changed += 1;
                }
                after
            })
            .collect();

        self.store.save_batch(&updated)?;
        info!(%effect, processed, changed, "batch care applied");
        Ok(BatchReport {
            processed,
            changed,
            scheduled: 0,
        })
    }

    /// Recompute every plant's health status from its water level.
    ///
    /// On a transition into an unhealthy state a notification check is
    /// scheduled before anything is saved, so a failed save re-detects the
    /// transition on redelivery instead of losing the follow-up.
    #[instrument(skip(self))]
    pub fn health_check(&self) -> Result<BatchReport> {
        let plants = self.store.list_all()?;
        if plants.is_empty() {
            info!("no plants to check");
            return Ok(BatchReport::default());
        }

        let processed = plants.len();
        let mut scheduled = 0;
        let mut changed = Vec::new();
        for mut plant in plants {
            let Some(change) = evaluate_health(&plant) else {
                continue;
            };
            info!(
                plant_id = %plant.id,
                old = %change.from,
                new = %change.to,
                "plant health status changed"
            );
            plant.health_status = change.to;

            if change.needs_follow_up() {
                let job_id = self.scheduler.enqueue_after(
                    &CareJob::NotifyIfUnhealthy { plant_id: plant.id },
                    self.notification_delay,
                )?;
                scheduled += 1;
                info!(
                    plant_id = %plant.id,
                    %job_id,
                    delay_secs = self.notification_delay.as_secs(),
                    "notification check scheduled"
                );
            }
            changed.push(plant);
        }

        self.store.save_batch(&changed)?;
        info!(processed, changed = changed.len(), scheduled, "health check complete");
        Ok(BatchReport {
            processed,
            changed: changed.len(),
            scheduled,
        })
    }

    /// +25 growth for one plant. A missing plant is a logged no-op (`None`).
    #[instrument(skip(self), fields(plant_id = %plant_id))]
    pub fn apply_fertilizer(&self, plant_id: PlantId) -> Result<Option<Plant>> {
        let Some(plant) = self.store.get_by_id(plant_id)? else {
            warn!("plant not found; fertilizer effect not applied");
            return Ok(None);
        };

        let plant = lifecycle::fertilize(plant);
        self.store.save_batch(std::slice::from_ref(&plant))?;
        info!(growth_points = plant.growth_points, "fertilizer applied");
        Ok(Some(plant))
    }

    pub fn notify_if_unhealthy(&self, plant_id: PlantId) -> Result<NotificationOutcome> {
        self.notifier.check(plant_id)
    }
}
