//! `sprout-core` — types shared by every Sprout crate.
//!
//! Holds the plant identifier, the job payloads that travel through the durable
//! scheduler, the [`job::JobScheduler`] capability the lifecycle engine is
//! handed, and the layered configuration.

pub mod config;
pub mod error;
pub mod job;
pub mod types;

pub use error::{Result, SproutError};
pub use job::{CareJob, JobScheduler};
pub use types::PlantId;
