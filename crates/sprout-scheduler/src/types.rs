use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Defines when and how often a job should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run exactly once, no earlier than the given UTC instant.
    Once { at: DateTime<Utc> },

    /// Run forever according to a 5-field cron expression (UTC).
    Cron { expression: String },
}

/// Lifecycle state of a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its next_run time.
    Pending,
    /// Claimed by the engine and handed to a worker.
    Running,
    /// One-shot job finished successfully.
    Completed,
    /// One-shot job exhausted its retry budget.
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 string — primary key.
    pub id: String,
    /// Registration key; set only for recurring jobs.
    pub key: Option<String>,
    /// Job name, e.g. `water_all_plants`.
    pub name: String,
    pub schedule: Schedule,
    /// JSON payload forwarded to the worker.
    pub action: String,
    pub status: JobStatus,
    /// RFC 3339 timestamp of the most recent claim, if any.
    pub last_run: Option<String>,
    /// RFC 3339 timestamp of the next planned execution, if any.
    pub next_run: Option<String>,
    /// Total number of successful runs.
    pub run_count: u32,
    /// Failed attempts since the last success.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
