//! Pure per-plant care rules.
//!
//! Every function here takes a plant snapshot and returns the new value; the
//! engine owns loading and saving. Health status is recomputed from the water
//! level alone, so the stored status can never drift from it.

use chrono::{DateTime, Utc};

use crate::types::{HealthStatus, NewPlant, Plant};

pub const INITIAL_WATER_LEVEL: u8 = 50;
pub const MAX_WATER_LEVEL: u8 = 100;
pub const WATERING_AMOUNT: u8 = 10;
pub const SUNLIGHT_GROWTH: u32 = 5;
pub const FERTILIZER_GROWTH: u32 = 25;

/// Below this water level a plant is thirsty.
pub const THIRSTY_BELOW: u8 = 25;
/// Above this water level a plant is overwatered.
pub const OVERWATERED_ABOVE: u8 = 85;

/// Defaults for a freshly planted seed.
pub fn seedling(plant_type: &str, planted_at: DateTime<Utc>) -> NewPlant {
    NewPlant {
        plant_type: plant_type.to_string(),
        water_level: INITIAL_WATER_LEVEL,
        growth_points: 0,
        health_status: HealthStatus::Healthy,
        planted_at,
    }
}

pub fn water(mut plant: Plant) -> Plant {
    plant.water_level = plant
        .water_level
        .saturating_add(WATERING_AMOUNT)
        .min(MAX_WATER_LEVEL);
    plant
}

pub fn give_sunlight(mut plant: Plant) -> Plant {
    plant.growth_points = plant.growth_points.saturating_add(SUNLIGHT_GROWTH);
    plant
}

pub fn fertilize(mut plant: Plant) -> Plant {
    plant.growth_points = plant.growth_points.saturating_add(FERTILIZER_GROWTH);
    plant
}

/// Total classification of a water level.
pub fn health_status(water_level: u8) -> HealthStatus {
    if water_level < THIRSTY_BELOW {
        HealthStatus::Thirsty
    } else if water_level > OVERWATERED_ABOVE {
        HealthStatus::Overwatered
    } else {
        HealthStatus::Healthy
    }
}

/// An observed change of stored health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

impl StatusChange {
    /// Entering any unhealthy state (including unhealthy → other unhealthy)
    /// warrants a delayed notification check. Recovery does not.
    pub fn needs_follow_up(&self) -> bool {
        !self.to.is_healthy()
    }
}

/// Diff the stored status against the one implied by the current water level.
pub fn evaluate_health(plant: &Plant) -> Option<StatusChange> {
    let to = health_status(plant.water_level);
    (to != plant.health_status).then_some(StatusChange {
        from: plant.health_status,
        to,
    })
}
