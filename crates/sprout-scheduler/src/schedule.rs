use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::{Result, SchedulerError};
use crate::types::Schedule;

/// Upper bound on the retry backoff.
const MAX_RETRY_DELAY_SECS: i64 = 60 * 60;

/// Fixed-width UTC timestamp so `next_run <= ?` compares correctly as text.
pub fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a classic 5-field cron expression (`min hour dom month dow`).
///
/// The `cron` crate wants a leading seconds field, so `0` is prepended.
pub fn parse_cron(expression: &str) -> Result<cron::Schedule> {
    let fields = expression.split_whitespace().count();
    if fields != 5 {
        return Err(SchedulerError::InvalidSchedule(format!(
            "expected 5 cron fields, got {fields}: {expression:?}"
        )));
    }
    cron::Schedule::from_str(&format!("0 {}", expression.trim()))
        .map_err(|e| SchedulerError::InvalidSchedule(format!("{expression:?}: {e}")))
}

/// When a freshly inserted job should first fire.
///
/// A `Once` instant in the past is still returned: the job is simply overdue
/// and fires on the next tick.
pub fn first_run(schedule: &Schedule, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => Ok(*at),
        Schedule::Cron { expression } => parse_cron(expression)?
            .after(&now)
            .next()
            .ok_or_else(|| {
                SchedulerError::InvalidSchedule(format!("{expression:?} never fires"))
            }),
    }
}

/// Next execution strictly after `from`, or `None` once the schedule is exhausted.
pub fn next_run_after(schedule: &Schedule, from: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    match schedule {
        Schedule::Once { .. } => Ok(None),
        Schedule::Cron { expression } => Ok(parse_cron(expression)?.after(&from).next()),
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at one hour.
pub fn retry_delay(base_secs: u64, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(20);
    let secs = (base_secs as i64).saturating_mul(1i64 << exp);
    Duration::seconds(secs.min(MAX_RETRY_DELAY_SECS))
}
