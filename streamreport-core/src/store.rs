// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The aggregation model: a mutable, hierarchical store of package → test →
//! subtest results, safe under concurrent mutation and read.
//!
//! A single [`std::sync::Mutex`] guards the whole store: the event
//! processor is single-tasked, so one lock is sufficient and a `RwLock`
//! would add complexity without a corresponding benefit.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::sync::Mutex;
use std::time::Duration;

/// The terminal/non-terminal status of a package or test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Running,
    Pass,
    Fail,
    Skip,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Running)
    }

    /// A lowercase string form, used by [`crate::summary::RunSummary`] for
    /// JSON serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Skip => "skip",
        }
    }
}

/// A single test node, identified by its full slash-delimited path within a
/// package (e.g. `TestFoo/subcase_a`).
#[derive(Clone, Debug)]
pub struct TestResult {
    /// The leaf component of the full name.
    pub name: String,
    /// The full slash-delimited path.
    pub full_name: String,
    pub status: Status,
    pub elapsed: Duration,
    /// Retained for failed/skipped tests; may be empty for passed tests.
    pub output: Vec<String>,
    /// Empty for top-level tests.
    pub parent_full_name: String,
    /// Full names of direct children, in the order they were first observed.
    pub children: Vec<String>,
    pub skip_reason: Option<String>,
}

impl TestResult {
    fn new(full_name: &str) -> Self {
        let (parent_full_name, name) = match full_name.rsplit_once('/') {
            Some((parent, leaf)) => (parent.to_string(), leaf.to_string()),
            None => (String::new(), full_name.to_string()),
        };
        Self {
            name,
            full_name: full_name.to_string(),
            status: Status::Running,
            elapsed: Duration::ZERO,
            output: Vec::new(),
            parent_full_name,
            children: Vec::new(),
            skip_reason: None,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_full_name.is_empty()
    }
}

/// Statement/function coverage as reported by the runner, retained verbatim
/// for display; parsed to a number only when averaging.
#[derive(Clone, Debug, Default)]
pub struct Coverage {
    pub statement_pct: Option<String>,
    pub function_pct: Option<String>,
    /// The legacy single-value coverage field, used when the runner reports
    /// one undifferentiated percentage rather than separate statement and
    /// function figures.
    pub legacy_pct: Option<String>,
}

/// One package's worth of aggregated state.
#[derive(Clone, Debug)]
pub struct PackageResult {
    pub name: String,
    pub start: Option<DateTime<Local>>,
    pub end: Option<DateTime<Local>>,
    pub status: Status,
    /// All tests in this package, keyed by full name, in creation order.
    /// Top-level tests are those with an empty `parent_full_name`.
    pub tests: IndexMap<String, TestResult>,
    pub output: Vec<String>,
    pub coverage: Coverage,
    pub elapsed: Duration,
    pub has_tests: bool,
    /// Set when a `[no test files]`/`[no statements]` marker line was
    /// observed in the package's output.
    pub no_tests_flagged: bool,
}

impl PackageResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: None,
            end: None,
            status: Status::Running,
            tests: IndexMap::new(),
            output: Vec::new(),
            coverage: Coverage::default(),
            elapsed: Duration::ZERO,
            has_tests: false,
            no_tests_flagged: false,
        }
    }

    /// Top-level tests only, in creation order.
    pub fn top_level_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.tests.values().filter(|t| t.is_top_level())
    }
}

/// A point-in-time snapshot of the run's aggregate counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

#[derive(Default)]
struct StoreInner {
    packages: IndexMap<String, PackageResult>,
    counts: RunCounts,
}

/// The hierarchical, mutex-guarded store of package/test results.
///
/// Callers (the [`crate::processor::EventProcessor`]) must release any
/// borrow before invoking reporter callbacks — the methods below return
/// owned snapshots rather than guards precisely so that the lock is never
/// held across a reporter call.
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates the package if absent and marks it active. Idempotent.
    pub fn ensure_package_started(&self, package: &str) {
        let mut inner = self.lock();
        let pkg = inner
            .packages
            .entry(package.to_string())
            .or_insert_with(|| PackageResult::new(package));
        if pkg.start.is_none() {
            pkg.start = Some(Local::now());
        }
    }

    fn ensure_package(inner: &mut StoreInner, package: &str) -> &mut PackageResult {
        inner
            .packages
            .entry(package.to_string())
            .or_insert_with(|| PackageResult::new(package))
    }

    /// Appends a line to the package-level output buffer, parsing coverage
    /// and build-failure markers.
    pub fn package_output(&self, package: &str, line: &str) {
        let mut inner = self.lock();
        let pkg = Self::ensure_package(&mut inner, package);
        pkg.output.push(line.to_string());

        if line.contains("coverage:") {
            apply_coverage_line(&mut pkg.coverage, line);
        }
        if line.contains("[no test files]") {
            pkg.no_tests_flagged = true;
        }
        if is_fail_marker(line, package) {
            pkg.status = Status::Fail;
            pkg.has_tests = true;
        }
    }

    /// Records a terminal package-level event (`pass`/`fail`/`skip` with no
    /// test name).
    ///
    /// Returns `true` if this package had zero observed test nodes at the
    /// point of completion, which the caller uses to decide whether to count
    /// a build/init failure: a package with zero test nodes and a terminal
    /// fail status is interpreted as a build failure.
    pub fn package_terminal(&self, package: &str, status: Status, elapsed: Duration) -> bool {
        debug_assert!(status.is_terminal());
        let mut inner = self.lock();
        let pkg = Self::ensure_package(&mut inner, package);

        if pkg.status.is_terminal() && !pkg.tests.is_empty() {
            // Already completed via a build-failure marker or a duplicate
            // terminal event; terminal -> terminal transitions don't fire
            // twice.
        } else if status == Status::Pass && (!pkg.has_tests || pkg.no_tests_flagged) {
            pkg.has_tests = false;
            pkg.status = Status::Pass;
        } else {
            pkg.status = status;
        }

        pkg.end = Some(Local::now());
        pkg.elapsed = elapsed;

        let no_tests = pkg.tests.is_empty();
        if status == Status::Fail && no_tests {
            inner.counts.failed += 1;
        }
        no_tests
    }

    /// Creates the test (and any missing ancestor) lazily and marks it
    /// running. Mirrors a `run` event.
    pub fn test_run(&self, package: &str, full_name: &str) {
        let mut inner = self.lock();
        let pkg = Self::ensure_package(&mut inner, package);
        pkg.has_tests = true;
        ensure_test_chain(pkg, full_name);
        if let Some(test) = pkg.tests.get_mut(full_name) {
            test.status = Status::Running;
        }
    }

    /// Appends output to a test's buffer, creating the package/test lazily if
    /// output arrives before `run`.
    pub fn test_output(&self, package: &str, full_name: &str, line: &str) {
        let mut inner = self.lock();
        let pkg = Self::ensure_package(&mut inner, package);
        pkg.has_tests = true;
        ensure_test_chain(pkg, full_name);
        if let Some(test) = pkg.tests.get_mut(full_name) {
            test.output.push(line.to_string());
        }
    }

    /// Records a terminal test event. Returns `false` if the test was
    /// already terminal (in which case no counters were touched — "last
    /// writer does not win").
    pub fn test_terminal(
        &self,
        package: &str,
        full_name: &str,
        status: Status,
        elapsed: Duration,
    ) -> bool {
        debug_assert!(status.is_terminal());
        let mut inner = self.lock();
        let pkg = Self::ensure_package(&mut inner, package);
        pkg.has_tests = true;
        ensure_test_chain(pkg, full_name);

        let already_terminal = pkg
            .tests
            .get(full_name)
            .is_some_and(|t| t.status.is_terminal());
        if already_terminal {
            return false;
        }

        if status == Status::Skip {
            let reason = pkg
                .tests
                .get(full_name)
                .and_then(|t| extract_skip_reason(&t.output));
            if let Some(test) = pkg.tests.get_mut(full_name) {
                test.skip_reason = reason;
            }
        }

        if let Some(test) = pkg.tests.get_mut(full_name) {
            test.status = status;
            test.elapsed = elapsed;
            if test.status == Status::Pass {
                // Passed test output may be dropped; retain only failures
                // and skips.
                test.output.clear();
            }
        }

        match status {
            Status::Pass => inner.counts.passed += 1,
            Status::Fail => inner.counts.failed += 1,
            Status::Skip => inner.counts.skipped += 1,
            Status::Running => unreachable!("checked by debug_assert above"),
        }
        true
    }

    /// On EOF, force-completes any package still `Running` to `Fail` with
    /// `has_tests = true`, in the order each package became active.
    pub fn force_incomplete_to_fail(&self) -> Vec<String> {
        let mut inner = self.lock();
        let mut forced = Vec::new();
        let names: Vec<String> = inner.packages.keys().cloned().collect();
        for name in names {
            let pkg = inner.packages.get_mut(&name).expect("just listed");
            if !pkg.status.is_terminal() {
                pkg.status = Status::Fail;
                pkg.has_tests = true;
                pkg.end = Some(Local::now());
                if pkg.tests.is_empty() {
                    inner.counts.failed += 1;
                }
                forced.push(name);
            }
        }
        forced
    }

    /// A read-only clone of one package's current state.
    pub fn package_snapshot(&self, package: &str) -> Option<PackageResult> {
        self.lock().packages.get(package).cloned()
    }

    /// The current aggregate counters.
    pub fn counts(&self) -> RunCounts {
        self.lock().counts
    }

    /// A clone of every package currently known, in creation order.
    pub fn all_packages(&self) -> Vec<PackageResult> {
        self.lock().packages.values().cloned().collect()
    }
}

/// Ensures `full_name` and every ancestor implied by its `/`-delimited path
/// exist in `pkg.tests`, wiring up `children` links as it goes.
fn ensure_test_chain(pkg: &mut PackageResult, full_name: &str) {
    if pkg.tests.contains_key(full_name) {
        return;
    }

    if let Some((parent, _)) = full_name.rsplit_once('/') {
        ensure_test_chain(pkg, parent);
        if let Some(parent_test) = pkg.tests.get_mut(parent) {
            if !parent_test.children.iter().any(|c| c == full_name) {
                parent_test.children.push(full_name.to_string());
            }
        }
    }

    pkg.tests
        .entry(full_name.to_string())
        .or_insert_with(|| TestResult::new(full_name));
}

/// Extracts a skip reason from a test's captured output: the first
/// substring after `.go:<line>: ` that isn't whitespace; falls back to the
/// text following the last colon on a `t.Skip`/`Skipping` line.
fn extract_skip_reason(output: &[String]) -> Option<String> {
    static GO_LOCATION: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = GO_LOCATION.get_or_init(|| regex::Regex::new(r"\.go:\d+:\s*(.+)$").unwrap());

    for line in output {
        if let Some(caps) = re.captures(line.trim_end()) {
            let reason = caps.get(1).unwrap().as_str().trim();
            if !reason.is_empty() {
                return Some(reason.to_string());
            }
        }
    }

    for line in output {
        if line.contains("t.Skip") || line.contains("Skipping") {
            if let Some((_, after)) = line.trim_end().rsplit_once(':') {
                let reason = after.trim();
                if !reason.is_empty() {
                    return Some(reason.to_string());
                }
            }
        }
    }

    None
}

fn is_fail_marker(line: &str, package: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed
        .strip_prefix("FAIL\t")
        .map(|rest| rest.split_whitespace().next() == Some(package))
        .unwrap_or(false)
}

/// Applies one `coverage:`-bearing output line to a package's [`Coverage`].
/// Numeric fields are set at most once; later coverage lines only
/// contribute to the retained output buffer.
fn apply_coverage_line(coverage: &mut Coverage, line: &str) {
    if coverage.statement_pct.is_some() {
        return;
    }

    if line.contains("[no statements]") {
        coverage.statement_pct = Some("0.0%".to_string());
        return;
    }
    if line.contains("[no test files]") {
        coverage.statement_pct = Some("0.0%".to_string());
        coverage.function_pct = None;
        return;
    }

    let Some(idx) = line.find("coverage:") else {
        return;
    };
    let after = &line[idx + "coverage:".len()..];
    let Some(token) = after.split_whitespace().next() else {
        return;
    };

    coverage.statement_pct = Some(if token.ends_with('%') {
        token.to_string()
    } else {
        "0.0%".to_string()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_created_lazily_and_has_tests_flag() {
        let store = Store::new();
        store.ensure_package_started("pkg");
        let snap = store.package_snapshot("pkg").expect("created");
        assert!(!snap.has_tests);

        store.test_run("pkg", "TestFoo");
        let snap = store.package_snapshot("pkg").expect("created");
        assert!(snap.has_tests);
    }

    #[test]
    fn subtest_creates_parent_chain() {
        let store = Store::new();
        store.test_run("pkg", "TestFoo/sub_a");
        let snap = store.package_snapshot("pkg").unwrap();
        assert!(snap.tests.contains_key("TestFoo"));
        assert!(snap.tests.contains_key("TestFoo/sub_a"));
        assert_eq!(snap.tests["TestFoo"].children, vec!["TestFoo/sub_a"]);
        assert!(snap.tests["TestFoo"].is_top_level());
        assert!(!snap.tests["TestFoo/sub_a"].is_top_level());
    }

    #[test]
    fn terminal_transition_only_fires_once() {
        let store = Store::new();
        store.test_run("pkg", "TestFoo");
        assert!(store.test_terminal("pkg", "TestFoo", Status::Pass, Duration::from_millis(1)));
        // A second terminal event for the same test must not double-count.
        assert!(!store.test_terminal("pkg", "TestFoo", Status::Fail, Duration::from_millis(1)));
        assert_eq!(store.counts(), RunCounts { passed: 1, failed: 0, skipped: 0 });
    }

    #[test]
    fn package_fail_without_tests_counts_once() {
        let store = Store::new();
        store.ensure_package_started("pkg");
        store.package_output("pkg", "./x.go:5:2: undefined: Foo\n");
        store.package_output("pkg", "FAIL\tpkg [build failed]\n");
        let no_tests = store.package_terminal("pkg", Status::Fail, Duration::ZERO);
        assert!(no_tests);
        assert_eq!(store.counts().failed, 1);
    }

    #[test]
    fn package_pass_with_no_tests_clears_has_tests() {
        let store = Store::new();
        store.ensure_package_started("pkg");
        store.package_output("pkg", "?   \tpkg\t[no test files]\n");
        store.package_terminal("pkg", Status::Pass, Duration::ZERO);
        let snap = store.package_snapshot("pkg").unwrap();
        assert!(!snap.has_tests);
        assert_eq!(snap.status, Status::Pass);
    }

    #[test]
    fn force_incomplete_to_fail_on_eof() {
        let store = Store::new();
        store.ensure_package_started("a");
        store.ensure_package_started("b");
        store.package_terminal("a", Status::Pass, Duration::ZERO);
        let forced = store.force_incomplete_to_fail();
        assert_eq!(forced, vec!["b".to_string()]);
        let snap = store.package_snapshot("b").unwrap();
        assert_eq!(snap.status, Status::Fail);
        assert!(snap.has_tests);
    }

    #[test]
    fn skip_reason_extracted_from_go_location_line() {
        let store = Store::new();
        store.test_run("pkg", "TestFoo");
        store.test_output("pkg", "TestFoo", "    skip_test.go:9: not on this platform\n");
        store.test_terminal("pkg", "TestFoo", Status::Skip, Duration::ZERO);
        let snap = store.package_snapshot("pkg").unwrap();
        assert_eq!(
            snap.tests["TestFoo"].skip_reason.as_deref(),
            Some("not on this platform")
        );
    }

    #[test]
    fn coverage_parsed_once_and_retained_verbatim() {
        let mut coverage = Coverage::default();
        apply_coverage_line(&mut coverage, "coverage: 83.3% of statements\n");
        apply_coverage_line(&mut coverage, "coverage: 99.9% of statements\n");
        assert_eq!(coverage.statement_pct.as_deref(), Some("83.3%"));
    }

    #[test]
    fn coverage_no_statements_marker() {
        let mut coverage = Coverage::default();
        apply_coverage_line(&mut coverage, "coverage: [no statements]\n");
        assert_eq!(coverage.statement_pct.as_deref(), Some("0.0%"));
    }
}
