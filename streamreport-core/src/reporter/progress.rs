// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The progress-bar ("TUI") reporter variant: a single live-updating bar
//! instead of per-package blocks, selected via `--ui=progress`.

use super::Reporter;
use crate::store::{PackageResult, Status};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders a single progress bar that advances as packages complete, and
/// prints a final summary line when the run finishes.
///
/// Unlike [`super::streaming::StreamingReporter`], this variant intentionally
/// does not echo individual test output as it streams in -- that would tear
/// up the bar's redraw region. Failures are instead listed once at
/// `finalize` time, deferring detailed failure output to the end-of-run
/// summary.
pub struct ProgressReporter {
    bar: ProgressBar,
    estimated_total: u64,
    completed: u64,
    failures: Vec<String>,
}

impl ProgressReporter {
    /// `estimated_total` is the expected package count (`--estimated-total`),
    /// used only to size the bar; actual completions beyond that estimate are
    /// handled gracefully by indicatif (the bar simply exceeds 100%).
    pub fn new(estimated_total: u64) -> Self {
        let bar = ProgressBar::new(estimated_total.max(1));
        bar.set_style(
            ProgressStyle::with_template(
                "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self {
            bar,
            estimated_total,
            completed: 0,
            failures: Vec::new(),
        }
    }
}

impl Reporter for ProgressReporter {
    fn on_package_start(&mut self, package: &str) {
        self.bar.set_message(package.to_string());
    }

    fn on_package_complete(&mut self, package: &PackageResult) {
        self.completed += 1;
        if self.completed > self.estimated_total {
            self.bar.set_length(self.completed);
        }
        self.bar.set_position(self.completed);
        if package.status == Status::Fail {
            self.failures.push(package.name.clone());
        }
    }

    fn on_test_start(&mut self, _package: &str, _test: &str) {}
    fn on_test_complete(&mut self, _package: &str, _test: &str) {}

    fn finalize(&mut self, passed: usize, failed: usize, skipped: usize, elapsed: Duration) -> String {
        self.bar.finish_and_clear();

        let mut out = format!(
            "{passed} passed, {failed} failed, {skipped} skipped in {:.3}s\n",
            elapsed.as_secs_f64()
        );
        if !self.failures.is_empty() {
            out.push_str("failed packages:\n");
            for name in &self.failures {
                out.push_str(&format!("  {name}\n"));
            }
        }
        print!("{out}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn tracks_failed_packages_for_final_summary() {
        let store = Store::new();
        store.package_terminal("ok-pkg", Status::Pass, Duration::ZERO);
        store.package_terminal("bad-pkg", Status::Fail, Duration::ZERO);

        let mut reporter = ProgressReporter::new(2);
        reporter.on_package_complete(&store.package_snapshot("ok-pkg").unwrap());
        reporter.on_package_complete(&store.package_snapshot("bad-pkg").unwrap());

        let summary = reporter.finalize(1, 1, 0, Duration::from_secs(1));
        assert!(summary.contains("bad-pkg"));
    }

    #[test]
    fn completions_beyond_estimate_do_not_panic() {
        let store = Store::new();
        let mut reporter = ProgressReporter::new(1);
        for i in 0..3 {
            store.package_terminal(&format!("p{i}"), Status::Pass, Duration::ZERO);
            reporter.on_package_complete(&store.package_snapshot(&format!("p{i}")).unwrap());
        }
        let _ = reporter.finalize(3, 0, 0, Duration::ZERO);
    }
}
