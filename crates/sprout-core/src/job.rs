//! Care job payloads and the scheduling capability handed to the lifecycle engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::PlantId;

/// Stored as a JSON string in the `jobs.action` column.
///
/// Every unit of work the durable scheduler runs on behalf of the garden is
/// one of these; the worker pool parses it back and hands it to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum CareJob {
    /// Insert a new plant with default vitals.
    CreatePlant { plant_type: String },
    /// Recurring: +10 water for every plant, clamped at 100.
    WaterAll,
    /// Recurring: +5 growth for every plant.
    SunlightAll,
    /// Recurring: recompute health status for every plant.
    HealthCheck,
    /// Delayed one-shot: +25 growth for a single plant.
    Fertilize { plant_id: PlantId },
    /// Delayed one-shot: alert if the plant is still unhealthy.
    NotifyIfUnhealthy { plant_id: PlantId },
}

impl CareJob {
    /// Stable job name recorded in the `jobs.name` column.
    pub fn name(&self) -> &'static str {
        match self {
            CareJob::CreatePlant { .. } => "create_plant",
            CareJob::WaterAll => "water_all_plants",
            CareJob::SunlightAll => "sunlight_all_plants",
            CareJob::HealthCheck => "health_check_all_plants",
            CareJob::Fertilize { .. } => "apply_fertilizer",
            CareJob::NotifyIfUnhealthy { .. } => "notify_if_unhealthy",
        }
    }

    pub fn to_action(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_action(action: &str) -> Result<Self> {
        Ok(serde_json::from_str(action)?)
    }
}

/// Durable job runner as seen from the lifecycle engine.
///
/// All three calls are fire-and-forget: they return once the job is
/// persisted, not once it has run.
pub trait JobScheduler: Send + Sync {
    /// Run as soon as a worker is free. Returns the job id.
    fn enqueue_now(&self, job: &CareJob) -> Result<String>;

    /// Run no earlier than `delay` from now. Returns the job id.
    fn enqueue_after(&self, job: &CareJob, delay: Duration) -> Result<String>;

    /// Upsert a recurring registration keyed by `key` on a 5-field cron cadence.
    fn register_recurring(&self, key: &str, job: &CareJob, cron: &str) -> Result<()>;
}
