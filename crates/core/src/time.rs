//! Clock helpers used for human-readable reporting.
//!
//! Scheduling decisions are made on [`Instant`]; these helpers only translate
//! monotonic instants into wall-clock timestamps and render them.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta, Utc};

/// Map a monotonic instant onto the wall clock.
///
/// The mapping is an approximation anchored at the current moment, so it
/// shifts if the system clock is adjusted between two calls.
pub fn wall_clock(instant: Instant) -> DateTime<Utc> {
    let now_wall = Utc::now();
    let now_mono = Instant::now();
    if instant <= now_mono {
        now_wall - to_delta(now_mono - instant)
    } else {
        now_wall + to_delta(instant - now_mono)
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::zero())
}

/// Render a timestamp in local time as `YYYY-MM-DD HH:MM:SS.mmm`.
pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

/// Render a duration as `H:MM:SS.mmm`.
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
