use std::sync::Arc;

use sprout_core::PlantId;
use tracing::{info, instrument, warn};

use crate::alert::{AlertSink, PlantAlert};
use crate::error::Result;
use crate::store::PlantStore;

/// What a delayed notification check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The plant no longer resolves; nothing to do.
    Missing,
    /// The plant is healthy again; no alert.
    Recovered,
    /// The plant is still unhealthy; an alert was raised.
    Alerted(PlantAlert),
}

/// Re-checks one plant after the grace period and alerts if it has not recovered.
///
/// Runs once per scheduled check; it never schedules another one.
pub struct NotificationEvaluator {
    store: Arc<dyn PlantStore>,
    alerts: Arc<dyn AlertSink>,
}

impl NotificationEvaluator {
    pub fn new(store: Arc<dyn PlantStore>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { store, alerts }
    }

    #[instrument(skip(self), fields(plant_id = %plant_id))]
    pub fn check(&self, plant_id: PlantId) -> Result<NotificationOutcome> {
        let Some(plant) = self.store.get_by_id(plant_id)? else {
            warn!("notification check: plant not found");
            return Ok(NotificationOutcome::Missing);
        };

        if plant.health_status.is_healthy() {
            info!("notification check: plant is healthy again, no alert");
            return Ok(NotificationOutcome::Recovered);
        }

        let alert = PlantAlert::from(&plant);
        self.alerts.raise(&alert);
        Ok(NotificationOutcome::Alerted(alert))
    }
}
