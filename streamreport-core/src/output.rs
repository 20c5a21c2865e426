// Copyright (c) The nextest Contributors
// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of streamreport-core's own diagnostic logging (not the
//! test-run report itself -- see [`crate::reporter`] for that).
//!
//! The `clap`-facing `--color` flag and its `ValueEnum` live in the binary
//! crate; this module only needs a plain three-way choice, which keeps
//! `clap` out of the library's dependency graph.

use owo_colors::{style, Style};
use std::fmt;
use tracing::{
    field::{Field, Visit},
    level_filters::LevelFilter,
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    filter::Targets,
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Whether to colorize diagnostic log output, independent of the terminal
/// renderer's own colorization (which each [`crate::reporter::Reporter`]
/// decides for itself).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Determines whether output should be colorized based on whether the
    /// given stream supports it.
    pub fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            ColorChoice::Auto => supports_color::on_cached(stream).is_some(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Initializes the `tracing` subscriber used for streamreport-core's own
/// `debug!`/`trace!`/`warn!` diagnostics (archival write failures, skipped
/// unparseable lines, and so on -- distinct from the user-facing test
/// report). Controlled by the `STREAMREPORT_LOG` environment variable using
/// `tracing_subscriber::filter::Targets` syntax. Safe to call more than
/// once; only the first call takes effect.
pub fn init_logging(color: ColorChoice) {
    let mut log_styles = LogStyles::default();
    if color.should_colorize(supports_color::Stream::Stderr) {
        log_styles.colorize();
    }

    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var_os("STREAMREPORT_LOG").unwrap_or_default();
        let level_str = level_str
            .into_string()
            .unwrap_or_else(|_| panic!("STREAMREPORT_LOG is not UTF-8"));

        let targets = if level_str.is_empty() {
            Targets::new().with_default(LevelFilter::INFO)
        } else {
            level_str.parse().expect("unable to parse STREAMREPORT_LOG")
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter { styles: log_styles })
            .with_writer(std::io::stderr)
            .with_filter(targets);

        tracing_subscriber::registry().with(layer).init();
    });
}

struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != "streamreport::no_heading" {
            match *metadata.level() {
                Level::ERROR => write!(writer, "{}: ", "error".style(self.styles.error))?,
                Level::WARN => write!(writer, "{}: ", "warning".style(self.styles.warning))?,
                Level::INFO => write!(writer, "{}: ", "info".style(self.styles.info))?,
                Level::DEBUG => write!(writer, "{}: ", "debug".style(self.styles.debug))?,
                Level::TRACE => write!(writer, "{}: ", "trace".style(self.styles.trace))?,
            }
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };

        event.record(&mut visitor);

        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            if let Err(error) = write!(self.writer, "{value:?}") {
                self.error = Some(error);
            }
        } else if self.show_other {
            if let Err(error) = write!(self.writer, "; {} = {:?}", field.name(), value) {
                self.error = Some(error);
            }
        }
    }
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
    trace: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.info = style().bold();
        self.debug = style().bold();
        self.trace = style().dimmed();
    }
}
