use thiserror::Error;

#[derive(Debug, Error)]
pub enum SproutError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The durable job runner refused or failed to accept a job.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SproutError {
    /// Short error code string used in logs and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SproutError::Config(_) => "CONFIG_ERROR",
            SproutError::Scheduler(_) => "SCHEDULER_ERROR",
            SproutError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SproutError>;
