// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A `serde`-serializable snapshot of a finished run's aggregated state.
//!
//! This is an additive, thin `serde_json` projection of the [`Store`]
//! emitted alongside the archival JSONL file when the caller asks for one;
//! it does not replace or alter that file, and its own existence does not
//! change the archival-fidelity guarantee -- the raw JSONL remains
//! byte-for-byte what the child produced.

use crate::store::{PackageResult, RunCounts, Store, TestResult};
use camino::Utf8Path;
use serde::Serialize;
use std::io;
use std::time::Duration;

/// The top-level summary written to the `--json-summary` file.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
    pub packages: Vec<PackageSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub status: &'static str,
    pub elapsed_secs: f64,
    pub has_tests: bool,
    pub statement_coverage: Option<String>,
    pub function_coverage: Option<String>,
    pub tests: Vec<TestSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TestSummary {
    pub full_name: String,
    pub status: &'static str,
    pub elapsed_secs: f64,
    pub skip_reason: Option<String>,
}

impl RunSummary {
    /// Builds a summary from a finished [`Store`]. Callers (normally
    /// [`crate::supervisor::RunnerSupervisor`]) invoke this once, after
    /// `finish` has force-completed any incomplete packages, so every
    /// package/test reflects a terminal status.
    pub fn from_store(store: &Store, counts: RunCounts, elapsed: Duration) -> Self {
        Self {
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
            elapsed_secs: elapsed.as_secs_f64(),
            packages: store
                .all_packages()
                .iter()
                .map(PackageSummary::from_package)
                .collect(),
        }
    }

    /// Serializes this summary as pretty-printed JSON to `path`.
    pub fn write_to_file(&self, path: &Utf8Path) -> io::Result<()> {
        let file = std::fs::File::create(path.as_std_path())?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::from)
    }
}

impl PackageSummary {
    fn from_package(pkg: &PackageResult) -> Self {
        Self {
            name: pkg.name.clone(),
            status: pkg.status.as_str(),
            elapsed_secs: pkg.elapsed.as_secs_f64(),
            has_tests: pkg.has_tests,
            statement_coverage: pkg.coverage.statement_pct.clone(),
            function_coverage: pkg.coverage.function_pct.clone(),
            tests: pkg.tests.values().map(TestSummary::from_test).collect(),
        }
    }
}

impl TestSummary {
    fn from_test(test: &TestResult) -> Self {
        Self {
            full_name: test.full_name.clone(),
            status: test.status.as_str(),
            elapsed_secs: test.elapsed.as_secs_f64(),
            skip_reason: test.skip_reason.clone(),
        }
    }
}
