// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `streamreport` binary: a thin CLI shell around `streamreport-core`.
//!
//! Parses flags, resolves CI mode and color, builds the chosen
//! [`streamreport_core::reporter::Reporter`], and drives
//! [`streamreport_core::supervisor::RunnerSupervisor`]. This is the only
//! place in the repo allowed to call `std::process::exit`.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use streamreport_core::output::{self, ColorChoice};
use streamreport_core::reporter::progress::ProgressReporter;
use streamreport_core::reporter::streaming::{StreamingReporter, StreamingReporterBuilder};
use streamreport_core::reporter::{Reporter, ShowFilter, Verbosity};
use streamreport_core::store::PackageResult;
use streamreport_core::supervisor::{RunOptions, RunnerSupervisor};
use streamreport_core::SignalHandlerKind;
use std::io;
use std::time::Duration;

/// A streaming test-execution reporter that wraps an underlying
/// JSONL-emitting test runner.
#[derive(Debug, Parser)]
#[command(name = "streamreport", version, about)]
struct Cli {
    /// Which terminal test statuses get a per-test line: all, failed,
    /// passed, skipped, collapsed (package summaries only), or none.
    #[arg(long, value_enum, default_value_t = ShowArg::All)]
    show: ShowArg,

    /// String used only to annotate the "no tests matching filter" message;
    /// streamreport does not itself select which tests the runner executes.
    #[arg(long, default_value = "")]
    test_filter: String,

    /// How much captured output to re-emit for failing tests.
    #[arg(long, value_enum, default_value_t = VerbosityArg::Standard)]
    verbosity: VerbosityArg,

    /// Shorthand for `--verbosity minimal`.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Shorthand for `--verbosity verbose`.
    #[arg(short, long)]
    verbose: bool,

    /// Emit a terminal bell (`\x07`) when the run finishes.
    #[arg(long)]
    alert: bool,

    /// Appends `-coverprofile=<path>` to the runner invocation.
    #[arg(long, value_name = "PATH")]
    cover_profile: Option<Utf8PathBuf>,

    /// Path to the archival JSONL output file. Receives the runner's
    /// stdout verbatim, including non-JSON lines.
    #[arg(long, visible_alias = "jsonfile", default_value = "streamreport.jsonl")]
    output_file: Utf8PathBuf,

    /// Also write a serde-derived JSON snapshot of the final aggregation to
    /// this path, alongside the archival JSONL.
    #[arg(long, value_name = "PATH")]
    json_summary: Option<Utf8PathBuf>,

    /// Expected package count, used only to size the progress renderer's
    /// bar; ignored by the streaming renderer.
    #[arg(long, default_value_t = 0)]
    estimated_total: u64,

    /// Which renderer to use.
    #[arg(long, value_enum, default_value_t = UiArg::Streaming)]
    ui: UiArg,

    /// Produce color output: auto, always, never.
    #[arg(long, value_enum, default_value_t = ColorArg::Auto, value_name = "WHEN")]
    color: ColorArg,

    /// Force CI mode on, regardless of the environment probe.
    #[arg(long, conflicts_with = "no_ci_mode")]
    ci_mode: bool,

    /// Force CI mode off, regardless of the environment probe.
    #[arg(long)]
    no_ci_mode: bool,

    /// The test runner to invoke, followed by its own arguments, e.g.
    /// `streamreport -- go test -json ./...`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    runner_command: Vec<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ShowArg {
    All,
    Failed,
    Passed,
    Skipped,
    Collapsed,
    None,
}

impl From<ShowArg> for ShowFilter {
    fn from(value: ShowArg) -> Self {
        match value {
            ShowArg::All => ShowFilter::All,
            ShowArg::Failed => ShowFilter::Failed,
            ShowArg::Passed => ShowFilter::Passed,
            ShowArg::Skipped => ShowFilter::Skipped,
            ShowArg::Collapsed => ShowFilter::Collapsed,
            ShowArg::None => ShowFilter::None,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum VerbosityArg {
    Minimal,
    Standard,
    WithOutput,
    Verbose,
}

impl From<VerbosityArg> for Verbosity {
    fn from(value: VerbosityArg) -> Self {
        match value {
            VerbosityArg::Minimal => Verbosity::Minimal,
            VerbosityArg::Standard => Verbosity::Standard,
            VerbosityArg::WithOutput => Verbosity::WithOutput,
            VerbosityArg::Verbose => Verbosity::Verbose,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UiArg {
    Streaming,
    Progress,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Auto => ColorChoice::Auto,
            ColorArg::Always => ColorChoice::Always,
            ColorArg::Never => ColorChoice::Never,
        }
    }
}

/// Dispatches to whichever concrete reporter the CLI selected. A tagged
/// enum rather than `Box<dyn Reporter>`, since there are only two variants
/// and neither needs dynamic dispatch.
enum AnyReporter {
    Streaming(StreamingReporter<io::Stdout>),
    Progress(ProgressReporter),
}

impl Reporter for AnyReporter {
    fn on_package_start(&mut self, package: &str) {
        match self {
            Self::Streaming(r) => r.on_package_start(package),
            Self::Progress(r) => r.on_package_start(package),
        }
    }

    fn on_package_complete(&mut self, package: &PackageResult) {
        match self {
            Self::Streaming(r) => r.on_package_complete(package),
            Self::Progress(r) => r.on_package_complete(package),
        }
    }

    fn on_test_start(&mut self, package: &str, test: &str) {
        match self {
            Self::Streaming(r) => r.on_test_start(package, test),
            Self::Progress(r) => r.on_test_start(package, test),
        }
    }

    fn on_test_complete(&mut self, package: &str, test: &str) {
        match self {
            Self::Streaming(r) => r.on_test_complete(package, test),
            Self::Progress(r) => r.on_test_complete(package, test),
        }
    }

    fn finalize(&mut self, passed: usize, failed: usize, skipped: usize, elapsed: Duration) -> String {
        match self {
            Self::Streaming(r) => r.finalize(passed, failed, skipped, elapsed),
            Self::Progress(r) => r.finalize(passed, failed, skipped, elapsed),
        }
    }
}

/// CI mode resolution: an explicit flag takes precedence over the `is_ci`
/// environment probe (see DESIGN.md for why flag-vs-probe precedence is
/// resolved this way rather than "whichever says true wins").
fn resolve_ci_mode(cli: &Cli) -> bool {
    if cli.ci_mode {
        true
    } else if cli.no_ci_mode {
        false
    } else {
        is_ci::uncached()
    }
}

fn resolve_verbosity(cli: &Cli) -> Verbosity {
    if cli.quiet {
        Verbosity::Minimal
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        cli.verbosity.into()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = ColorChoice::from(cli.color);
    output::init_logging(color);

    let ci_mode = resolve_ci_mode(&cli);
    let verbosity = resolve_verbosity(&cli);
    let should_colorize = color.should_colorize(supports_color::Stream::Stdout);
    let unicode = supports_unicode::on(supports_unicode::Stream::Stdout);

    let mut runner_args = cli.runner_command.clone();
    let command = runner_args.remove(0);

    let reporter = match cli.ui {
        UiArg::Streaming => {
            let reporter = StreamingReporterBuilder::default()
                .set_show(cli.show.into())
                .set_verbosity(verbosity)
                .set_test_filter_active(!cli.test_filter.is_empty())
                .set_alert(cli.alert)
                .set_colorize(should_colorize)
                .set_unicode(unicode)
                .build(io::stdout());
            AnyReporter::Streaming(reporter)
        }
        UiArg::Progress => AnyReporter::Progress(ProgressReporter::new(cli.estimated_total)),
    };

    let options = RunOptions {
        args: runner_args,
        cover_profile: cli.cover_profile.clone(),
        output_file: cli.output_file.clone(),
        ci_mode,
        json_summary_file: cli.json_summary.clone(),
    };

    let supervisor = RunnerSupervisor::with_signal_handler(SignalHandlerKind::Standard);

    match supervisor.run(&command, options, reporter).await {
        Ok(outcome) => {
            tracing::debug!(reason = %outcome.reason, "run finished");
            std::process::exit(outcome.exit_code);
        }
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}
