// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking how long a run takes.
//!
//! A run needs to track a start time and a duration. For that we use a
//! combination of a `DateTime<Local>` (wall clock, for display) and an
//! `Instant` (monotonic clock, for the actual elapsed-time measurement).

use chrono::{DateTime, Local};
use std::time::Instant;

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // These two syscalls will happen imperceptibly close to each
            // other, which is good enough for our purposes.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            active: self.instant.elapsed(),
        }
    }
}

/// A snapshot of the state of the stopwatch.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StopwatchSnapshot {
    /// The time at which the stopwatch was started.
    #[allow(unused)]
    pub(crate) start_time: DateTime<Local>,
    /// The amount of time elapsed since the stopwatch was started.
    pub(crate) active: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stopwatch_measures_elapsed_time() {
        let start = stopwatch();
        std::thread::sleep(Duration::from_millis(20));
        let snap = start.snapshot();
        assert!(snap.active >= Duration::from_millis(20));
    }
}
