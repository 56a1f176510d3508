use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The provided schedule definition is invalid or unsupported.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No job with the given ID exists in the store.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the connection lock.
    #[error("scheduler connection lock poisoned")]
    LockPoisoned,
}

impl From<SchedulerError> for sprout_core::SproutError {
    fn from(e: SchedulerError) -> Self {
        sprout_core::SproutError::Scheduler(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
