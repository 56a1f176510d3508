use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sprout_core::PlantId;

/// Health classification derived from a plant's water level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Thirsty,
    Overwatered,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Thirsty => "thirsty",
            HealthStatus::Overwatered => "overwatered",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "thirsty" => Ok(HealthStatus::Thirsty),
            "overwatered" => Ok(HealthStatus::Overwatered),
            other => Err(format!("unknown health status: {other}")),
        }
    }
}

/// A persisted plant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub plant_type: String,
    /// Always within 0..=100.
    pub water_level: u8,
    /// Never decreases.
    pub growth_points: u32,
    pub health_status: HealthStatus,
    pub planted_at: DateTime<Utc>,
    /// Store-managed optimistic concurrency token.
    #[serde(default, skip_serializing)]
    pub revision: i64,
}

/// Field values for a plant that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlant {
    pub plant_type: String,
    pub water_level: u8,
    pub growth_points: u32,
    pub health_status: HealthStatus,
    pub planted_at: DateTime<Utc>,
}
