//! `sprout-garden` — the plant care lifecycle.
//!
//! Plants live in a [`store::PlantStore`]. The [`engine::CareEngine`] applies
//! the scheduled effects (watering, sunlight, fertilizer), runs the health
//! state machine and asks the injected [`sprout_core::JobScheduler`] for
//! follow-up jobs. The [`notify::NotificationEvaluator`] decides, a day after
//! a plant turned unhealthy, whether an alert is still warranted.
//!
//! The per-plant rules are pure functions in [`lifecycle`]; everything that
//! touches the store or the scheduler goes through the engine.

pub mod alert;
pub mod db;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod schedule;
pub mod store;
pub mod types;

pub use alert::{AlertSink, LogAlertSink, PlantAlert};
pub use engine::{BatchReport, CareEngine};
pub use error::{GardenError, Result};
pub use notify::{NotificationEvaluator, NotificationOutcome};
pub use store::{PlantStore, SqlitePlantStore};
pub use types::{HealthStatus, NewPlant, Plant};
