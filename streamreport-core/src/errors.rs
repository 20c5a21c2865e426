// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by streamreport-core.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while spawning the wrapped test runner.
#[derive(Debug, Error)]
#[error("failed to spawn test runner `{command}`")]
#[non_exhaustive]
pub struct SpawnError {
    pub(crate) command: String,
    #[source]
    pub(crate) source: io::Error,
}

impl SpawnError {
    pub(crate) fn new(command: impl Into<String>, source: io::Error) -> Self {
        Self {
            command: command.into(),
            source,
        }
    }
}

/// An error that occurred while setting up the interrupt signal handler.
#[derive(Debug, Error)]
#[error("failed to install signal handler")]
#[non_exhaustive]
pub struct SignalHandlerSetupError {
    #[source]
    pub(crate) source: io::Error,
}

impl SignalHandlerSetupError {
    pub(crate) fn new(source: io::Error) -> Self {
        Self { source }
    }
}

/// An error that occurred while reading the runner's stdout.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Reading the next line from stdout failed.
    #[error("error reading test runner stdout")]
    ReadStdout(#[source] io::Error),
}

/// An error that occurred while writing a line to the archival JSON output
/// file.
///
/// Archival errors are logged but never abort a run; see
/// [`crate::supervisor::RunOutcome`].
#[derive(Debug, Error)]
#[error("failed to write to archival output file `{path}`")]
#[non_exhaustive]
pub struct ArchiveWriteError {
    pub(crate) path: Utf8PathBuf,
    #[source]
    pub(crate) source: io::Error,
}

impl ArchiveWriteError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// An error that occurred while opening the archival JSON output file.
#[derive(Debug, Error)]
#[error("failed to open archival output file `{path}`")]
#[non_exhaustive]
pub struct ArchiveOpenError {
    pub(crate) path: Utf8PathBuf,
    #[source]
    pub(crate) source: io::Error,
}

impl ArchiveOpenError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// A top-level error produced by [`crate::supervisor::RunnerSupervisor::run`].
///
/// Most failure modes do *not* produce this error type; they are instead
/// folded into a non-zero exit code and a human-readable reason by
/// [`crate::diagnose::ExitDiagnoser`]. This error type is reserved for the
/// subset of failures ([`SpawnError`], [`ScannerError`]) that are fatal for
/// the run.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The runner process could not be spawned.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Setting up the signal handler failed.
    #[error(transparent)]
    SignalSetup(#[from] SignalHandlerSetupError),

    /// An I/O error occurred while scanning the runner's output streams.
    #[error(transparent)]
    Scanner(#[from] ScannerError),

    /// The archival output file could not be opened.
    #[error(transparent)]
    ArchiveOpen(#[from] ArchiveOpenError),
}
