//! Wiring between the care jobs and the durable scheduler.

use sprout_core::{config::CareConfig, CareJob, JobScheduler, PlantId};
use tracing::info;

use crate::error::Result;

pub const WATERING_KEY: &str = "water-all-plants";
pub const SUNLIGHT_KEY: &str = "sunlight-all-plants";
pub const HEALTH_CHECK_KEY: &str = "health-check-all-plants";

/// Register (or re-register) the three recurring care jobs.
///
/// Called on every process start; registrations are keyed upserts, so a
/// restart or a cadence change never duplicates them.
pub fn register_care_schedule(scheduler: &dyn JobScheduler, care: &CareConfig) -> Result<()> {
    let recurring = [
        (WATERING_KEY, CareJob::WaterAll, care.watering_cron.as_str()),
        (SUNLIGHT_KEY, CareJob::SunlightAll, care.sunlight_cron.as_str()),
        (HEALTH_CHECK_KEY, CareJob::HealthCheck, care.health_check_cron.as_str()),
    ];
    for (key, job, cron) in recurring {
        scheduler.register_recurring(key, &job, cron)?;
        info!(%key, %cron, job = job.name(), "recurring care job registered");
    }
    Ok(())
}

/// Trigger point for "create plant with type T". Returns the accepted job id.
pub fn request_plant(scheduler: &dyn JobScheduler, plant_type: &str) -> Result<String> {
    let job_id = scheduler.enqueue_now(&CareJob::CreatePlant {
        plant_type: plant_type.to_string(),
    })?;
    info!(%job_id, %plant_type, "plant creation enqueued");
    Ok(job_id)
}

/// Trigger point for "fertilize plant P". The effect lands after the
/// configured fertilizer delay; the plant is not looked up here.
pub fn request_fertilizer(scheduler: &dyn JobScheduler, plant_id: PlantId, care: &CareConfig) -> Result<String> {
    let delay = care.fertilizer_delay();
    let job_id = scheduler.enqueue_after(&CareJob::Fertilize { plant_id }, delay)?;
    info!(%job_id, %plant_id, delay_secs = delay.as_secs(), "fertilizer scheduled");
    Ok(job_id)
}
