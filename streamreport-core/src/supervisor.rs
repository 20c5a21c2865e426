// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The top-level entry point: spawns the wrapped runner, drives its stdout
//! through the scanner and processor, forwards signals, and produces a
//! final exit-code diagnosis.

use crate::diagnose::{DiagnosisInput, ExitDiagnoser};
use crate::errors::{ArchiveOpenError, ArchiveWriteError, SpawnError, SupervisorError};
use crate::process_group::{self, TerminateSignal};
use crate::processor::EventProcessor;
use crate::reporter::Reporter;
use crate::scanner::EventScanner;
use crate::signal::SignalHandlerKind;
use crate::stderr::StderrCapture;
use crate::store::Store;
use camino::Utf8PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::warn;

/// Grace period between a graceful-terminate signal and a forcible kill.
/// A second interrupt during this window escalates immediately.
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Options controlling one invocation of [`RunnerSupervisor::run`]. Does not
/// include `show`/`verbosity`, which are properties of the [`Reporter`] the
/// caller constructs rather than of the supervisor itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Arguments passed to the wrapped runner, verbatim.
    pub args: Vec<String>,
    /// When set, a `-coverprofile=<path>` argument is appended.
    pub cover_profile: Option<Utf8PathBuf>,
    /// Path to the archival JSONL output file.
    pub output_file: Utf8PathBuf,
    /// Whether `--ci-mode` (or its environment-probe equivalent) is active;
    /// threaded through to [`ExitDiagnoser`].
    pub ci_mode: bool,
    /// When set, a [`crate::summary::RunSummary`] is written to this path
    /// once the run completes. Additive to `output_file`; never affects
    /// archival fidelity.
    pub json_summary_file: Option<Utf8PathBuf>,
}

/// The result of a completed run: the exit code and reason to present to
/// the caller, plus the reporter's rendered summary text.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub reason: String,
    pub summary: String,
}

/// Owns one invocation of the wrapped runner, from spawn through exit-code
/// diagnosis.
pub struct RunnerSupervisor {
    signal_kind: SignalHandlerKind,
}

impl Default for RunnerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerSupervisor {
    pub fn new() -> Self {
        Self {
            signal_kind: SignalHandlerKind::Standard,
        }
    }

    /// Builds a supervisor with an explicit [`SignalHandlerKind`]. Tests use
    /// [`SignalHandlerKind::Noop`] to avoid installing real OS signal
    /// handlers when running in parallel with other tests.
    pub fn with_signal_handler(signal_kind: SignalHandlerKind) -> Self {
        Self { signal_kind }
    }

    /// Runs `command` to completion, feeding its stdout through the event
    /// pipeline and its stderr through the diagnoser's capture buffer.
    pub async fn run<R: Reporter>(
        &self,
        command: &str,
        options: RunOptions,
        reporter: R,
    ) -> Result<RunOutcome, SupervisorError> {
        let mut cmd = Command::new(command);
        cmd.args(&options.args);
        if let Some(profile) = &options.cover_profile {
            cmd.arg(format!("-coverprofile={profile}"));
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        process_group::set_process_group(cmd.as_std_mut());

        let mut child = cmd
            .spawn()
            .map_err(|source| SpawnError::new(command, source))?;
        let pid = child.id();

        let stdout = child.stdout.take().expect("configured with Stdio::piped");
        let stderr = child.stderr.take().expect("configured with Stdio::piped");

        let mut archive = tokio::fs::File::create(options.output_file.as_std_path())
            .await
            .map_err(|source| ArchiveOpenError::new(options.output_file.clone(), source))?;

        let stderr_capture = Arc::new(StderrCapture::new());
        let stderr_task = tokio::spawn(forward_stderr(stderr, stderr_capture.clone()));

        let mut signal_handler = self.signal_kind.build()?;

        let store = Arc::new(Store::new());
        let mut processor = EventProcessor::new(store.clone(), reporter);
        let mut scanner = EventScanner::new(stdout);
        let stopwatch = crate::time::stopwatch();

        let mut interrupted = false;
        let mut term_sent = false;
        let mut scanner_error = None;

        loop {
            tokio::select! {
                line = scanner.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Err(source) = write_archive_line(&mut archive, &line).await {
                                let error = ArchiveWriteError::new(options.output_file.clone(), source);
                                warn!(%error, "archival write failed; continuing run");
                            }
                            processor.process_line(&line);
                        }
                        Ok(None) => break,
                        Err(error) => {
                            scanner_error = Some(error);
                            break;
                        }
                    }
                }
                shutdown = signal_handler.recv() => {
                    if shutdown.is_some() {
                        if !interrupted {
                            eprintln!("aborted");
                        }
                        interrupted = true;
                        if let Some(pid) = pid {
                            if !term_sent {
                                process_group::signal_process_group(pid, TerminateSignal::Graceful);
                                term_sent = true;
                                tokio::spawn(async move {
                                    tokio::time::sleep(GRACE_PERIOD).await;
                                    process_group::signal_process_group(pid, TerminateSignal::Forceful);
                                });
                            } else {
                                process_group::signal_process_group(pid, TerminateSignal::Forceful);
                            }
                        }
                    }
                }
            }
        }

        let wait_result = child.wait().await;
        let _ = stderr_task.await;

        let elapsed = stopwatch.snapshot().active;
        let (counts, summary) = processor.finish(elapsed);
        let captured_stderr = stderr_capture.snapshot();

        if let Some(path) = &options.json_summary_file {
            let run_summary = crate::summary::RunSummary::from_store(&store, counts, elapsed);
            if let Err(error) = run_summary.write_to_file(path) {
                warn!(%error, path = %path, "failed to write json summary file");
            }
        }

        let (process_error, child_status) = match (scanner_error, wait_result) {
            (Some(scanner_error), _) => (Some(scanner_error.to_string()), None),
            (None, Ok(status)) => (None, Some(status)),
            (None, Err(wait_error)) => (Some(format!("failed to wait for child: {wait_error}")), None),
        };

        let diagnosis = ExitDiagnoser.diagnose(&DiagnosisInput {
            interrupted,
            process_error: process_error.as_deref(),
            child_status,
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
            captured_stderr: &captured_stderr,
            ci_mode: options.ci_mode,
        });

        Ok(RunOutcome {
            exit_code: diagnosis.0,
            reason: diagnosis.1,
            summary,
        })
    }
}

async fn write_archive_line(archive: &mut tokio::fs::File, line: &str) -> std::io::Result<()> {
    archive.write_all(line.as_bytes()).await?;
    archive.write_all(b"\n").await
}

/// Copies the child's stderr line-by-line to the live UI and the capped
/// capture buffer used by [`ExitDiagnoser`]. Runs as its own task so a slow
/// or silent stderr never blocks stdout processing.
async fn forward_stderr(stderr: ChildStderr, capture: Arc<StderrCapture>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                eprintln!("{line}");
                capture.append(&line);
                capture.append("\n");
            }
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "error reading test runner stderr");
                break;
            }
        }
    }
}
