use sprout_core::{PlantId, SproutError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GardenError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Scheduler hand-off or payload failure.
    #[error(transparent)]
    Core(#[from] SproutError),

    /// Another job saved this plant after our snapshot was taken. The whole
    /// batch is rolled back; re-delivery retries it against fresh data.
    #[error("plant {id} was modified concurrently")]
    Conflict { id: PlantId },

    #[error("plant store lock poisoned")]
    LockPoisoned,
}

impl GardenError {
    /// Short error code string sent to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            GardenError::Database(_) => "DATABASE_ERROR",
            GardenError::Core(e) => e.code(),
            GardenError::Conflict { .. } => "CONFLICT",
            GardenError::LockPoisoned => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GardenError>;
