// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The exit-code diagnoser: correlates the run's aggregated counts with
//! captured stderr text to produce a final `(exit code, reason)` tuple.

use std::process::ExitStatus;

/// The outcome handed to [`ExitDiagnoser::diagnose`].
#[derive(Debug)]
pub struct DiagnosisInput<'a> {
    pub interrupted: bool,
    /// Set when a processing error (scanner I/O fault) occurred.
    pub process_error: Option<&'a str>,
    pub child_status: Option<ExitStatus>,
    pub passed: usize,
    pub failed: usize,
    #[allow(dead_code)]
    pub skipped: usize,
    pub captured_stderr: &'a str,
    pub ci_mode: bool,
}

/// A stateless rule-based classifier. Implemented as a unit struct rather
/// than free functions so that it reads the same way as the other component
/// types ([`crate::scanner::EventScanner`],
/// [`crate::processor::EventProcessor`]) even though it holds no state of its
/// own.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitDiagnoser;

/// "TestMain initialization" hints that, combined with a log-level marker,
/// indicate a fatal logging call that didn't actually terminate the process.
const INIT_HINTS: &[&str] = &[
    "Failed to locate git repository",
    "Failed to get current working directory",
    "Failed to initialize",
    "Fatal error:",
];

const LOG_LEVEL_MARKERS: &[&str] = &["level=", "INFO", "WARN", "DEBUG"];

impl ExitDiagnoser {
    /// Computes `(exit code, reason)` for a finished run, following the
    /// rule chain top to bottom. Every branch is reachable and returns:
    /// callers get a reason string even for the fallback path.
    pub fn diagnose(&self, input: &DiagnosisInput<'_>) -> (i32, String) {
        if input.interrupted {
            return (130, "aborted by signal".to_string());
        }

        if let Some(error) = input.process_error {
            return (1, format!("processing error: {error}"));
        }

        let Some(status) = input.child_status else {
            return (
                0,
                format!(
                    "all {} tests passed successfully",
                    input.passed
                ),
            );
        };

        let Some(child_exit_code) = status.code() else {
            // Terminated by signal on platforms that surface that:
            // `ExitStatus::code()` returns `None`.
            return (
                signal_terminated_code(&status),
                format!("test process terminated by signal ({})", signal_description(&status)),
            );
        };

        if child_exit_code == 0 && input.failed == 0 {
            return (
                0,
                format!("all {} tests passed successfully", input.passed),
            );
        }

        if input.failed > 0 {
            return (
                child_exit_code,
                format!(
                    "{} tests failed, runner exited with code {child_exit_code}",
                    input.failed
                ),
            );
        }

        if input.failed == 0 && input.passed > 0 && child_exit_code == 1 {
            return self.diagnose_passed_but_nonzero(input, child_exit_code);
        }

        (
            child_exit_code,
            format!("runner exited with code {child_exit_code}"),
        )
    }

    /// Sub-cases of `failed == 0 && passed > 0 && childExitCode == 1`.
    ///
    /// Every sub-case but CI-mode masking keeps `child_exit_code` as the
    /// reported exit code; only the CI-mode branch treats this as success.
    fn diagnose_passed_but_nonzero(
        &self,
        input: &DiagnosisInput<'_>,
        child_exit_code: i32,
    ) -> (i32, String) {
        let stderr = input.captured_stderr;

        let init_hint = INIT_HINTS.iter().find(|hint| stderr.contains(*hint));
        let has_log_marker = LOG_LEVEL_MARKERS.iter().any(|marker| stderr.contains(marker));

        if let Some(hint) = init_hint {
            if has_log_marker {
                return (
                    child_exit_code,
                    format!(
                        "TestMain initialization failed: all {} tests passed, but the runner \
                         exited with code 1 after logging past what looks like a fatal condition \
                         ({hint:?}). This usually means TestMain calls a `Fatal`-style logging \
                         method whose implementation doesn't actually terminate the process \
                         (only `os.Exit` inside `os.Exit(m.Run())` does); check that TestMain \
                         exits with the code `m.Run()` returns rather than continuing past a \
                         logged fatal error.",
                        input.passed
                    ),
                );
            }
        }

        if input.ci_mode {
            return (
                0,
                format!(
                    "all {} tests passed (CI mode: ignoring runner exit code 1)",
                    input.passed
                ),
            );
        }

        if stderr.contains("[setup failed]") {
            return (
                child_exit_code,
                "all tests passed, but the runner reported [setup failed]; \
                 check TestMain and any shared test fixtures for initialization errors"
                    .to_string(),
            );
        }

        if let Some(idx) = stderr.find("panic:") {
            let message = stderr[idx + "panic:".len()..]
                .lines()
                .next()
                .unwrap_or("")
                .trim();
            return (
                child_exit_code,
                format!(
                    "all tests passed, but the runner panicked after reporting results: {message}"
                ),
            );
        }

        if stderr.contains("[build failed]") {
            let offending: Vec<&str> = stderr
                .lines()
                .filter(|line| line.contains("undefined:") || line.contains("cannot find"))
                .collect();
            if offending.is_empty() {
                return (
                    child_exit_code,
                    "all tests passed, but a package reported [build failed] \
                     after results were emitted"
                        .to_string(),
                );
            }
            return (
                child_exit_code,
                format!(
                    "all tests passed, but a package reported [build failed]: {}",
                    offending.join("; ")
                ),
            );
        }

        if stderr.contains("os.Exit(") || stderr.contains("log.Fatal") || stderr.contains("logger.Fatal") {
            return (
                child_exit_code,
                "all tests passed, but the runner called an exit/fatal-logging \
                 function after reporting results; check for an early os.Exit or \
                 log.Fatal call that runs after TestMain's test loop"
                    .to_string(),
            );
        }

        (
            child_exit_code,
            format!(
                "all {} tests passed, but the runner exited with code 1 for an unrecognized \
                 reason; likely causes include an uncaught panic, an os.Exit call, or a \
                 TestMain that doesn't propagate m.Run()'s return code",
                input.passed
            ),
        )
    }
}

#[cfg(unix)]
fn signal_terminated_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|s| 128 + s).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_terminated_code(_status: &ExitStatus) -> i32 {
    -1
}

/// Names the signal that terminated the child, for the "terminated by
/// signal" reason string: `SIGTERM (15)` when the number maps to a known
/// name, or a bare quoted number otherwise.
#[cfg(unix)]
fn signal_description(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => match crate::helpers::signal_str(signal) {
            Some(name) => format!("SIG{name} ({signal})"),
            None => crate::helpers::QuotedDisplay(&signal).to_string(),
        },
        None => "unknown signal".to_string(),
    }
}

#[cfg(not(unix))]
fn signal_description(_status: &ExitStatus) -> String {
    "unknown signal".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        passed: usize,
        failed: usize,
        captured_stderr: &'a str,
    ) -> DiagnosisInput<'a> {
        DiagnosisInput {
            interrupted: false,
            process_error: None,
            child_status: None,
            passed,
            failed,
            skipped: 0,
            captured_stderr,
            ci_mode: false,
        }
    }

    #[test]
    fn interrupted_always_wins() {
        let mut i = input(0, 0, "");
        i.interrupted = true;
        i.process_error = Some("boom");
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 130);
        assert_eq!(reason, "aborted by signal");
    }

    #[test]
    fn process_error_before_child_status() {
        let mut i = input(0, 0, "");
        i.process_error = Some("broken pipe");
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 1);
        assert!(reason.contains("broken pipe"));
    }

    #[test]
    fn no_child_status_means_success() {
        let i = input(3, 0, "");
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 0);
        assert!(reason.contains("3 tests passed"));
    }

    #[test]
    fn failed_tests_report_child_exit_code() {
        let mut i = input(1, 2, "");
        i.child_status = Some(exit_status(1));
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 1);
        assert!(reason.contains("2 tests failed"));
    }

    #[test]
    fn ci_mode_masks_exit_code_one_with_no_failures() {
        let mut i = input(5, 0, "");
        i.ci_mode = true;
        i.child_status = Some(exit_status(1));
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 0, "CI mode should mask exit code 1 as success");
        assert!(reason.contains("CI mode"));
    }

    #[cfg(unix)]
    #[test]
    fn signal_terminated_child_names_the_signal() {
        use std::os::unix::process::ExitStatusExt;
        let mut i = input(0, 0, "");
        i.child_status = Some(ExitStatus::from_raw(15)); // raw & 0x7f != 0 => signal 15
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 128 + 15);
        assert!(reason.contains("SIGTERM"), "reason was: {reason}");
    }

    #[test]
    fn build_failed_marker_lists_offending_lines() {
        let mut i = input(
            2,
            0,
            "./x.go:5:2: undefined: Foo\nFAIL\tq [build failed]\n[build failed]\n",
        );
        i.child_status = Some(exit_status(1));
        let (_, reason) = ExitDiagnoser.diagnose(&i);
        assert!(reason.contains("undefined: Foo"));
    }

    #[test]
    fn fatal_logging_past_init_is_detected() {
        let mut i = input(
            4,
            0,
            "level=fatal msg=\"Failed to initialize\" Fatal error: setup aborted\n",
        );
        i.child_status = Some(exit_status(1));
        let (_, reason) = ExitDiagnoser.diagnose(&i);
        assert!(reason.contains("TestMain initialization failed"));
        assert!(reason.contains("os.Exit(m.Run())"));
    }

    #[test]
    fn generic_fallback_when_nothing_matches() {
        let mut i = input(1, 0, "some unrelated noise\n");
        i.child_status = Some(exit_status(1));
        let (code, reason) = ExitDiagnoser.diagnose(&i);
        assert_eq!(code, 1);
        assert!(reason.contains("unrecognized reason"));
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[cfg(not(unix))]
    fn exit_status(code: i32) -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}
