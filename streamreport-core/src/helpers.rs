// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small general-purpose display helpers used across the crate.

use std::fmt;
use std::time::Duration;

/// A duration formatted as `12.34s`, or `1m 02.34s` once it crosses a
/// minute -- used for the top-level run summary, where durations can run
/// much longer than the per-test/per-package durations in
/// [`crate::reporter::helpers`].
#[derive(Debug)]
pub(crate) struct FormattedDuration(pub(crate) Duration);

impl fmt::Display for FormattedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.0.as_secs_f64();
        if duration > 60.0 {
            write!(f, "{}m {:.2}s", duration as u32 / 60, duration % 60.0)
        } else {
            write!(f, "{duration:.2}s")
        }
    }
}

/// Maps a Unix signal number to its conventional short name, for diagnostic
/// messages about a signal-terminated child process.
#[cfg(unix)]
pub(crate) fn signal_str(signal: i32) -> Option<&'static str> {
    match signal {
        1 => Some("HUP"),
        2 => Some("INT"),
        3 => Some("QUIT"),
        4 => Some("ILL"),
        5 => Some("TRAP"),
        6 => Some("ABRT"),
        8 => Some("FPE"),
        9 => Some("KILL"),
        11 => Some("SEGV"),
        13 => Some("PIPE"),
        14 => Some("ALRM"),
        15 => Some("TERM"),
        _ => None,
    }
}

/// Wraps a displayable value in single quotes, e.g. for naming a path or
/// command in an error message.
#[derive(Copy, Clone, Debug)]
pub(crate) struct QuotedDisplay<'a, T: ?Sized>(pub(crate) &'a T);

impl<T: ?Sized> fmt::Display for QuotedDisplay<'_, T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_duration_switches_to_minutes_past_sixty_seconds() {
        assert_eq!(FormattedDuration(Duration::from_secs(5)).to_string(), "5.00s");
        assert_eq!(FormattedDuration(Duration::from_secs(75)).to_string(), "1m 15.00s");
    }

    #[cfg(unix)]
    #[test]
    fn signal_str_known_and_unknown() {
        assert_eq!(signal_str(15), Some("TERM"));
        assert_eq!(signal_str(200), None);
    }
}
