// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event stream processor: parses each event and updates the
//! [`Store`], coordinating reporter callbacks.

use crate::event::{Action, Event};
use crate::reporter::Reporter;
use crate::store::{RunCounts, Status, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Parses and applies events to a [`Store`], invoking a [`Reporter`] at the
/// points required to preserve its ordering guarantees.
///
/// The processor owns no I/O of its own: it is fed one line at a time by
/// whatever drives it (normally [`crate::supervisor::RunnerSupervisor`],
/// which also owns archival writes). This split keeps "apply this line to
/// the model" decoupled from "how did this line arrive," which is what lets
/// [`crate::supervisor`]'s tests replay fixtures directly into a processor
/// without spawning a subprocess.
pub struct EventProcessor<R: Reporter> {
    store: Arc<Store>,
    reporter: R,
}

impl<R: Reporter> EventProcessor<R> {
    pub fn new(store: Arc<Store>, reporter: R) -> Self {
        Self { store, reporter }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Parses one line and applies it to the store. Lines that fail to
    /// parse, or whose action is unknown, are silently skipped.
    pub fn process_line(&mut self, line: &str) {
        let event = match Event::parse_line(line) {
            Ok(event) => event,
            Err(error) => {
                trace!(%error, %line, "skipping unparseable event line");
                return;
            }
        };
        self.apply(event);
    }

    fn apply(&mut self, event: Event) {
        let elapsed = event
            .elapsed
            .map(Duration::from_secs_f64)
            .unwrap_or_default();

        match (event.action, event.is_package_level()) {
            (Action::Start, true) => {
                self.store.ensure_package_started(&event.package);
                self.reporter.on_package_start(&event.package);
            }
            (Action::Output, true) => {
                if let Some(output) = &event.output {
                    self.store.package_output(&event.package, output);
                }
            }
            (Action::Skip, true) => {
                self.store
                    .package_terminal(&event.package, Status::Skip, elapsed);
                self.complete_package(&event.package);
            }
            (Action::Pass, true) => {
                self.store
                    .package_terminal(&event.package, Status::Pass, elapsed);
                self.complete_package(&event.package);
            }
            (Action::Fail, true) => {
                self.store
                    .package_terminal(&event.package, Status::Fail, elapsed);
                self.complete_package(&event.package);
            }
            (Action::Run, false) => {
                self.store.test_run(&event.package, &event.test);
                self.reporter.on_test_start(&event.package, &event.test);
            }
            (Action::Output, false) => {
                if let Some(output) = &event.output {
                    self.store.test_output(&event.package, &event.test, output);
                }
            }
            (Action::Pass, false) => {
                self.complete_test(&event.package, &event.test, Status::Pass, elapsed);
            }
            (Action::Fail, false) => {
                self.complete_test(&event.package, &event.test, Status::Fail, elapsed);
            }
            (Action::Skip, false) => {
                self.complete_test(&event.package, &event.test, Status::Skip, elapsed);
            }
            (Action::Pause | Action::Cont | Action::Bench, _) | (Action::Unknown, _) => {
                debug!(action = ?event.action, "ignoring event with no processing effect");
            }
        }
    }

    fn complete_test(&mut self, package: &str, test: &str, status: Status, elapsed: Duration) {
        let counted = self.store.test_terminal(package, test, status, elapsed);
        if counted {
            self.reporter.on_test_complete(package, test);
        }
    }

    /// Releases the store lock before notifying the reporter: a package's
    /// terminal event is delivered to the reporter strictly after all of
    /// that package's test events have been applied to the store, and the
    /// reporter is never invoked with the store lock held.
    fn complete_package(&mut self, package: &str) {
        if let Some(snapshot) = self.store.package_snapshot(package) {
            self.reporter.on_package_complete(&snapshot);
        }
    }

    /// Drives EOF handling: force-completes any package still running, then
    /// asks the reporter to finalize. Returns the final counts and the
    /// reporter's rendered summary string.
    pub fn finish(mut self, elapsed: Duration) -> (RunCounts, String) {
        for package in self.store.force_incomplete_to_fail() {
            self.complete_package(&package);
        }
        let counts = self.store.counts();
        let summary = self
            .reporter
            .finalize(counts.passed, counts.failed, counts.skipped, elapsed);
        (counts, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        completed_packages: Mutex<Vec<String>>,
    }

    impl Reporter for &RecordingReporter {
        fn on_package_start(&mut self, _package: &str) {}
        fn on_package_complete(&mut self, package: &crate::store::PackageResult) {
            self.completed_packages.lock().unwrap().push(package.name.clone());
        }
        fn on_test_start(&mut self, _package: &str, _test: &str) {}
        fn on_test_complete(&mut self, _package: &str, _test: &str) {}
        fn finalize(&mut self, _passed: usize, _failed: usize, _skipped: usize, _elapsed: Duration) -> String {
            String::new()
        }
    }

    fn feed(processor: &mut EventProcessor<impl Reporter>, lines: &[&str]) {
        for line in lines {
            processor.process_line(line);
        }
    }

    #[test]
    fn clean_pass_scenario() {
        let store = Arc::new(Store::new());
        let mut processor = EventProcessor::new(store.clone(), NullReporter);
        feed(
            &mut processor,
            &[
                r#"{"Action":"start","Package":"p"}"#,
                r#"{"Action":"run","Package":"p","Test":"T"}"#,
                r#"{"Action":"output","Package":"p","Test":"T","Output":"ok\n"}"#,
                r#"{"Action":"pass","Package":"p","Test":"T","Elapsed":0.1}"#,
                r#"{"Action":"output","Package":"p","Output":"coverage: 83.3% of statements\n"}"#,
                r#"{"Action":"pass","Package":"p","Elapsed":0.11}"#,
            ],
        );
        let (counts, _) = processor.finish(Duration::from_millis(110));
        assert_eq!(counts, RunCounts { passed: 1, failed: 0, skipped: 0 });
        let snap = store.package_snapshot("p").unwrap();
        assert_eq!(snap.coverage.statement_pct.as_deref(), Some("83.3%"));
    }

    #[test]
    fn build_failure_scenario() {
        let store = Arc::new(Store::new());
        let mut processor = EventProcessor::new(store.clone(), NullReporter);
        feed(
            &mut processor,
            &[
                r#"{"Action":"start","Package":"q"}"#,
                r#"{"Action":"output","Package":"q","Output":"./x.go:5:2: undefined: Foo\n"}"#,
                r#"{"Action":"output","Package":"q","Output":"FAIL\tq [build failed]\n"}"#,
                r#"{"Action":"fail","Package":"q","Elapsed":0.0}"#,
            ],
        );
        let (counts, _) = processor.finish(Duration::ZERO);
        assert_eq!(counts, RunCounts { passed: 0, failed: 1, skipped: 0 });
    }

    #[test]
    fn subtest_failure_counts_parent_and_child() {
        let store = Arc::new(Store::new());
        let mut processor = EventProcessor::new(store.clone(), NullReporter);
        feed(
            &mut processor,
            &[
                r#"{"Action":"run","Package":"r","Test":"T"}"#,
                r#"{"Action":"run","Package":"r","Test":"T/A"}"#,
                r#"{"Action":"run","Package":"r","Test":"T/B"}"#,
                r#"{"Action":"pass","Package":"r","Test":"T/A","Elapsed":0.01}"#,
                r#"{"Action":"output","Package":"r","Test":"T/B","Output":"assertion failed\n"}"#,
                r#"{"Action":"fail","Package":"r","Test":"T/B","Elapsed":0.02}"#,
                r#"{"Action":"fail","Package":"r","Test":"T","Elapsed":0.03}"#,
                r#"{"Action":"fail","Package":"r","Elapsed":0.03}"#,
            ],
        );
        let (counts, _) = processor.finish(Duration::from_millis(30));
        // T/A passes, T/B and T both fail as distinct terminal test events.
        assert_eq!(counts, RunCounts { passed: 1, failed: 2, skipped: 0 });
        let snap = store.package_snapshot("r").unwrap();
        assert_eq!(snap.tests["T"].children, vec!["T/A", "T/B"]);
    }

    #[test]
    fn incomplete_package_forced_to_fail_on_finish() {
        let recorder = RecordingReporter::default();
        let store = Arc::new(Store::new());
        let mut processor = EventProcessor::new(store, &recorder);
        feed(&mut processor, &[r#"{"Action":"start","Package":"s"}"#]);
        let (counts, _) = processor.finish(Duration::ZERO);
        assert_eq!(counts.failed, 1);
        assert_eq!(*recorder.completed_packages.lock().unwrap(), vec!["s".to_string()]);
    }
}
