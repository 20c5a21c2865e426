// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental renderers. Two concrete variants share the [`Reporter`]
//! contract: [`streaming::StreamingReporter`] (the default) and
//! [`progress::ProgressReporter`] (a TUI variant).

mod helpers;
pub mod progress;
pub mod streaming;

use crate::store::PackageResult;
use std::time::Duration;

/// Which terminal test statuses produce a per-test line in the streaming
/// renderer's per-package block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum ShowFilter {
    #[default]
    All,
    Failed,
    Passed,
    Skipped,
    Collapsed,
    None,
}

impl ShowFilter {
    /// Whether a terminal test of the given status produces a line under
    /// this filter.
    pub fn shows(self, status: crate::store::Status) -> bool {
        use crate::store::Status::*;
        match self {
            ShowFilter::All => status.is_terminal(),
            ShowFilter::Failed => matches!(status, Fail | Skip),
            ShowFilter::Passed => matches!(status, Pass),
            ShowFilter::Skipped => matches!(status, Skip),
            ShowFilter::Collapsed | ShowFilter::None => false,
        }
    }
}

/// How much captured output to re-emit for failing tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Verbosity {
    Minimal,
    #[default]
    Standard,
    WithOutput,
    Verbose,
}

impl Verbosity {
    /// Whether failure output should be expanded (escape sequences rendered
    /// as real whitespace).
    pub fn expands_failure_output(self) -> bool {
        matches!(self, Verbosity::WithOutput | Verbosity::Verbose)
    }
}

/// The callback interface the [`crate::processor::EventProcessor`] drives.
/// Each callback is invoked at most once per logical event.
///
/// Implementations must be non-blocking under normal load; the processor
/// calls these synchronously on its own task and never buffers more than one
/// package's worth of work between calls.
pub trait Reporter {
    fn on_package_start(&mut self, package: &str);
    fn on_package_complete(&mut self, package: &PackageResult);
    fn on_test_start(&mut self, package: &str, test: &str);
    fn on_test_complete(&mut self, package: &str, test: &str);
    /// Called once, after EOF and after any incomplete packages have been
    /// force-completed. Returns the final rendered summary string.
    fn finalize(&mut self, passed: usize, failed: usize, skipped: usize, elapsed: Duration) -> String;
}

/// A reporter that does nothing. Useful for tests of the processor/store
/// that don't care about rendered output (mirrors
/// [`crate::signal::SignalHandlerKind::Noop`]'s role for signal handling).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_package_start(&mut self, _package: &str) {}
    fn on_package_complete(&mut self, _package: &PackageResult) {}
    fn on_test_start(&mut self, _package: &str, _test: &str) {}
    fn on_test_complete(&mut self, _package: &str, _test: &str) {}
    fn finalize(&mut self, _passed: usize, _failed: usize, _skipped: usize, _elapsed: Duration) -> String {
        String::new()
    }
}
