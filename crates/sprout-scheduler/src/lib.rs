//! `sprout-scheduler` — durable, Tokio-driven job runner with SQLite persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the table, claims every job whose `next_run` has arrived and hands it
//! to the worker pool over an mpsc channel. Workers report back through
//! [`handle::SchedulerHandle::complete`] or [`handle::SchedulerHandle::fail`].
//!
//! Delivery is at-least-once: a job claimed before a crash is still `running`
//! on the next start and is put back to `pending`.
//!
//! # Schedule variants
//!
//! | Variant | Behaviour                                              |
//! |---------|--------------------------------------------------------|
//! | `Once`  | Single fire at an absolute UTC instant (may be "now")  |
//! | `Cron`  | Classic 5-field cron expression, evaluated in UTC      |

pub mod db;
pub mod engine;
pub mod error;
pub mod handle;
pub mod schedule;
pub mod types;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use handle::{RetryPolicy, SchedulerHandle};
pub use types::{Job, JobStatus, Schedule};
