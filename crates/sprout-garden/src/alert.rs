use serde::Serialize;
use sprout_core::PlantId;
use tracing::error;

use crate::types::{HealthStatus, Plant};

/// High-severity signal: a plant is still unhealthy after the grace period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlantAlert {
    pub plant_id: PlantId,
    pub plant_type: String,
    pub status: HealthStatus,
}

impl From<&Plant> for PlantAlert {
    fn from(plant: &Plant) -> Self {
        Self {
            plant_id: plant.id,
            plant_type: plant.plant_type.clone(),
            status: plant.health_status,
        }
    }
}

/// Delivery mechanism for [`PlantAlert`]s (paging, chat, …).
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &PlantAlert);
}

/// Emits alerts as `error`-level events on the `sprout::alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&self, alert: &PlantAlert) {
        error!(
            target: "sprout::alert",
            plant_id = %alert.plant_id,
            plant_type = %alert.plant_type,
            status = %alert.status,
            "ALERT: plant is still unhealthy; user needs to take action"
        );
    }
}
