// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small display helpers shared by the streaming and progress reporters.

use std::fmt;
use std::time::Duration;

/// Pluralizes "test" based on count.
pub fn tests_str(count: usize) -> &'static str {
    if count == 1 { "test" } else { "tests" }
}

/// `[ 12.345s]`-style bracketed duration, right-aligned.
pub(super) struct DisplayBracketedDuration(pub Duration);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8.3}s] ", self.0.as_secs_f64())
    }
}

/// Renders a compact dot-gauge for a test's subtests: one dot per subtest,
/// green for pass and red for anything else, scaled down when `total` is
/// large. Never renders an all-green gauge when at least one subtest
/// failed -- naive integer-rounding of a scaled-down gauge can otherwise
/// round a lone failure away, which would be actively misleading.
///
/// `unicode` selects between the `●` glyph and a plain `o`/`x` fallback for
/// terminals [`supports_unicode`](https://docs.rs/supports-unicode) reports
/// as not supporting it.
pub fn dot_gauge(passed: usize, total: usize, unicode: bool) -> String {
    use owo_colors::OwoColorize;

    const MAX_DOTS: usize = 10;
    if total == 0 {
        return String::new();
    }

    let dots = total.min(MAX_DOTS);
    let failed = total - passed;

    let green_dots = if total <= MAX_DOTS {
        passed
    } else {
        // Scale proportionally, but never show an all-green gauge when at
        // least one subtest failed.
        let scaled = (passed * dots) / total;
        if failed > 0 && scaled == dots {
            dots - 1
        } else {
            scaled
        }
    };

    let (pass_glyph, fail_glyph) = if unicode { ("●", "●") } else { ("o", "x") };

    let mut out = String::with_capacity(dots);
    for i in 0..dots {
        if i < green_dots {
            out.push_str(&pass_glyph.green().to_string());
        } else {
            out.push_str(&fail_glyph.red().to_string());
        }
    }
    out
}

/// `50%`-style integer percentage, rounding to nearest.
pub fn pass_percentage(passed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_gauge_shows_at_least_one_red_when_any_failed() {
        // 1 failed out of 11 -- naive integer scaling to 10 dots would
        // round up to all 10 green; we force at least one red.
        let gauge = dot_gauge(10, 11, true);
        assert!(gauge.contains('\u{1b}'));
    }

    #[test]
    fn dot_gauge_falls_back_to_ascii_glyphs() {
        let gauge = dot_gauge(1, 2, false);
        assert!(gauge.contains('o'));
        assert!(gauge.contains('x'));
        assert!(!gauge.contains('\u{25cf}'));
    }

    #[test]
    fn pass_percentage_rounds() {
        assert_eq!(pass_percentage(1, 2), 50);
        assert_eq!(pass_percentage(0, 0), 0);
        assert_eq!(pass_percentage(2, 3), 67);
    }
}
