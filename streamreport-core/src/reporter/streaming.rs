// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The default "streaming" renderer: emits one block per package as soon as
//! it completes.

use super::helpers::{tests_str, DisplayBracketedDuration};
use super::{Reporter, ShowFilter, Verbosity};
use crate::helpers::FormattedDuration;
use crate::indenter::indented;
use crate::store::{PackageResult, Status, TestResult};
use crate::write_str::WriteStr as _;
use owo_colors::{OwoColorize, Style};
use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

/// Builder for [`StreamingReporter`]: a plain struct with `set_*` setters
/// consumed by a final `build`.
#[derive(Debug)]
pub struct StreamingReporterBuilder {
    show: ShowFilter,
    verbosity: Verbosity,
    test_filter_active: bool,
    alert: bool,
    should_colorize: bool,
    unicode: bool,
}

impl Default for StreamingReporterBuilder {
    fn default() -> Self {
        Self {
            show: ShowFilter::default(),
            verbosity: Verbosity::default(),
            test_filter_active: false,
            alert: false,
            should_colorize: false,
            unicode: true,
        }
    }
}

impl StreamingReporterBuilder {
    pub fn set_show(&mut self, show: ShowFilter) -> &mut Self {
        self.show = show;
        self
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) -> &mut Self {
        self.verbosity = verbosity;
        self
    }

    pub fn set_test_filter_active(&mut self, active: bool) -> &mut Self {
        self.test_filter_active = active;
        self
    }

    pub fn set_alert(&mut self, alert: bool) -> &mut Self {
        self.alert = alert;
        self
    }

    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Whether the dot-gauge may use the `●` glyph; set this from
    /// `supports_unicode::on` at the CLI boundary. Defaults to `true`.
    pub fn set_unicode(&mut self, unicode: bool) -> &mut Self {
        self.unicode = unicode;
        self
    }

    pub fn build<W: Write>(&self, writer: W) -> StreamingReporter<W> {
        StreamingReporter {
            writer,
            show: self.show,
            verbosity: self.verbosity,
            test_filter_active: self.test_filter_active,
            alert: self.alert,
            should_colorize: self.should_colorize,
            unicode: self.unicode,
            seen: HashSet::new(),
            stmt_coverage_total: 0.0,
            stmt_coverage_count: 0,
            func_coverage_total: 0.0,
            func_coverage_count: 0,
        }
    }
}

/// The default reporter: renders one block of text per completed package,
/// then a final aggregate summary.
pub struct StreamingReporter<W> {
    writer: W,
    show: ShowFilter,
    verbosity: Verbosity,
    test_filter_active: bool,
    alert: bool,
    should_colorize: bool,
    unicode: bool,
    /// The same package is never displayed twice.
    seen: HashSet<String>,
    stmt_coverage_total: f64,
    stmt_coverage_count: usize,
    func_coverage_total: f64,
    func_coverage_count: usize,
}

fn status_style(status: Status, should_colorize: bool) -> Style {
    if !should_colorize {
        return Style::new();
    }
    match status {
        Status::Pass => Style::new().green().bold(),
        Status::Fail => Style::new().red().bold(),
        Status::Skip => Style::new().yellow().bold(),
        Status::Running => Style::new().bold(),
    }
}

fn status_word(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASS",
        Status::Fail => "FAIL",
        Status::Skip => "SKIP",
        Status::Running => "RUN ",
    }
}

fn parse_pct(s: &str) -> Option<f64> {
    s.trim_end_matches('%').parse::<f64>().ok()
}

impl<W: Write> StreamingReporter<W> {
    fn record_coverage(&mut self, pkg: &PackageResult) {
        if let Some(pct) = pkg.coverage.statement_pct.as_deref().and_then(parse_pct) {
            self.stmt_coverage_total += pct;
            self.stmt_coverage_count += 1;
        }
        if let Some(pct) = pkg.coverage.function_pct.as_deref().and_then(parse_pct) {
            self.func_coverage_total += pct;
            self.func_coverage_count += 1;
        }
    }

    fn coverage_annotation(pkg: &PackageResult) -> Option<String> {
        match (&pkg.coverage.statement_pct, &pkg.coverage.function_pct) {
            (Some(s), Some(f)) => Some(format!("statements: {s}, functions: {f}")),
            (Some(s), None) => Some(format!("{s} statement coverage")),
            (None, Some(_)) => None,
            (None, None) => pkg
                .coverage
                .legacy_pct
                .as_ref()
                .map(|pct| format!("{pct} coverage")),
        }
    }

    /// When every top-level test in a fully-skipped package shares the same
    /// extracted skip reason (or there's only one skipped test), returns it
    /// so the package summary line can surface it. Mixed reasons are left
    /// for the per-test lines instead of picking one arbitrarily.
    fn sole_skip_reason(pkg: &PackageResult) -> Option<&str> {
        let mut reasons = pkg
            .top_level_tests()
            .filter(|t| t.status == Status::Skip)
            .map(|t| t.skip_reason.as_deref());
        let first = reasons.next()??;
        reasons.all(|r| r == Some(first)).then_some(first)
    }

    fn render_package_block(&mut self, pkg: &PackageResult) -> std::io::Result<()> {
        let style = status_style(pkg.status, self.should_colorize);
        writeln!(
            self.writer,
            "{}{} {}",
            DisplayBracketedDuration(pkg.elapsed),
            status_word(pkg.status).style(style),
            pkg.name
        )?;

        if pkg.status == Status::Fail && pkg.tests.is_empty() {
            writeln!(self.writer, "    package failed to build")?;
            write_indented(&mut self.writer, "    ", pkg.output.iter().map(String::as_str))?;
            return Ok(());
        }

        if pkg.tests.is_empty() {
            if self.test_filter_active {
                writeln!(self.writer, "    No tests matching filter")?;
            } else {
                writeln!(self.writer, "    No tests")?;
            }
            return Ok(());
        }

        for test in pkg.top_level_tests() {
            self.render_test_line(pkg, test)?;
        }

        self.render_package_summary(pkg)?;
        Ok(())
    }

    fn render_test_line(&mut self, pkg: &PackageResult, test: &TestResult) -> std::io::Result<()> {
        if !self.show.shows(test.status) {
            return Ok(());
        }

        let style = status_style(test.status, self.should_colorize);
        if test.children.is_empty() {
            match (test.status, test.skip_reason.as_deref()) {
                (Status::Skip, Some(reason)) => writeln!(
                    self.writer,
                    "    {} {} ({reason})",
                    status_word(test.status).style(style),
                    test.name
                )?,
                _ => writeln!(
                    self.writer,
                    "    {} {}",
                    status_word(test.status).style(style),
                    test.name
                )?,
            }
        } else {
            let (passed, total) = subtest_counts(pkg, test);
            let pct = super::helpers::pass_percentage(passed, total);
            writeln!(
                self.writer,
                "    {} {} {} {pct}% passed",
                status_word(test.status).style(style),
                test.name,
                super::helpers::dot_gauge(passed, total, self.unicode),
            )?;
            if test.status == Status::Fail {
                self.render_subtest_summary(pkg, test)?;
            }
        }

        if test.status == Status::Fail && self.verbosity.expands_failure_output() {
            let expanded: Vec<String> = test.output.iter().map(|l| expand_escapes(l)).collect();
            write_indented(&mut self.writer, "        ", expanded.iter().map(String::as_str))?;
        }
        Ok(())
    }

    fn render_subtest_summary(&mut self, pkg: &PackageResult, test: &TestResult) -> std::io::Result<()> {
        let mut passed = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();
        for child_name in &test.children {
            let Some(child) = pkg.tests.get(child_name) else {
                continue;
            };
            match child.status {
                Status::Pass => passed.push(child.name.as_str()),
                Status::Fail => failed.push(child.name.as_str()),
                Status::Skip => skipped.push(child.name.as_str()),
                Status::Running => {}
            }
        }

        if !failed.is_empty() {
            writeln!(self.writer, "        Failed: {}", failed.join(", "))?;
            if self.verbosity.expands_failure_output() {
                for name in &failed {
                    if let Some(child) = pkg.tests.get(&format!("{}/{}", test.full_name, name)) {
                        let expanded: Vec<String> =
                            child.output.iter().map(|l| expand_escapes(l)).collect();
                        write_indented(&mut self.writer, "            ", expanded.iter().map(String::as_str))?;
                    }
                }
            }
        }
        if !passed.is_empty() {
            writeln!(self.writer, "        Passed: {}", passed.join(", "))?;
        }
        if !skipped.is_empty() {
            writeln!(self.writer, "        Skipped: {}", skipped.join(", "))?;
        }
        Ok(())
    }

    fn render_package_summary(&mut self, pkg: &PackageResult) -> std::io::Result<()> {
        let (passed, failed, skipped) = tally(pkg);
        let coverage = Self::coverage_annotation(pkg);

        let mut line = if failed > 0 {
            format!("{failed} failed, {passed} passed, {skipped} skipped")
        } else if passed == 0 && skipped > 0 {
            let mut line = format!("all {skipped} {} skipped", tests_str(skipped));
            if let Some(reason) = Self::sole_skip_reason(pkg) {
                line.push_str(&format!(" ({reason})"));
            }
            line
        } else {
            format!("all {passed} {} passed", tests_str(passed))
        };

        if let Some(coverage) = coverage {
            line.push_str(&format!(" ({coverage})"));
        }

        writeln!(self.writer, "    {line}")
    }
}

fn tally(pkg: &PackageResult) -> (usize, usize, usize) {
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for test in pkg.top_level_tests() {
        match test.status {
            Status::Pass => passed += 1,
            Status::Fail => failed += 1,
            Status::Skip => skipped += 1,
            Status::Running => {}
        }
    }
    (passed, failed, skipped)
}

fn subtest_counts(pkg: &PackageResult, test: &TestResult) -> (usize, usize) {
    let total = test.children.len();
    let passed = test
        .children
        .iter()
        .filter(|name| pkg.tests.get(*name).is_some_and(|t| t.status == Status::Pass))
        .count();
    (passed, total)
}

/// Renders literal `\t`/`\n` escape sequences as real whitespace. The runner
/// sometimes emits output with these escaped rather than as raw control
/// characters when re-serializing captured test output.
fn expand_escapes(line: &str) -> String {
    line.replace("\\t", "\t").replace("\\n", "\n")
}

/// Writes a block of already-newline-terminated output lines to `writer`,
/// indenting every line (including any embedded newlines within a single
/// captured output line) by `indent`. Built on [`crate::indenter`].
fn write_indented<'a, W: Write>(
    writer: &mut W,
    indent: &'static str,
    lines: impl Iterator<Item = &'a str>,
) -> std::io::Result<()> {
    let mut buf = String::new();
    {
        let mut ind = indented(&mut buf).with_str(indent);
        for line in lines {
            ind.write_str(line)?;
        }
    }
    write!(writer, "{buf}")
}

impl<W: Write> Reporter for StreamingReporter<W> {
    fn on_package_start(&mut self, _package: &str) {
        // Streaming renderer emits nothing on package start.
    }

    fn on_package_complete(&mut self, package: &PackageResult) {
        if !self.seen.insert(package.name.clone()) {
            return;
        }
        self.record_coverage(package);
        // Best-effort: a render failure shouldn't abort the run, same as an
        // archival write error.
        let _ = self.render_package_block(package);
    }

    fn on_test_start(&mut self, _package: &str, _test: &str) {}
    fn on_test_complete(&mut self, _package: &str, _test: &str) {}

    fn finalize(&mut self, passed: usize, failed: usize, skipped: usize, elapsed: Duration) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:>6} passed\n{:>6} failed\n{:>6} skipped\n",
            passed, failed, skipped
        ));

        if self.stmt_coverage_count > 0 {
            out.push_str(&format!(
                "statement coverage: {:.1}% (avg over {} packages)\n",
                self.stmt_coverage_total / self.stmt_coverage_count as f64,
                self.stmt_coverage_count
            ));
        }
        if self.func_coverage_count > 0 {
            out.push_str(&format!(
                "function coverage: {:.1}% (avg over {} packages)\n",
                self.func_coverage_total / self.func_coverage_count as f64,
                self.func_coverage_count
            ));
        }

        out.push_str(&format!("elapsed: {}\n", FormattedDuration(elapsed)));

        let total = passed + failed + skipped;
        let verdict = if total == 0 {
            "no tests found".to_string()
        } else if failed > 0 {
            format!("{failed} {} failed", tests_str(failed))
        } else {
            "all tests passed".to_string()
        };
        out.push_str(&verdict);
        out.push('\n');

        let _ = write!(self.writer, "{out}");
        if self.alert {
            let _ = write!(self.writer, "\x07");
        }
        let _ = self.writer.flush();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use pretty_assertions::assert_eq;

    fn render_one_package(show: ShowFilter, verbosity: Verbosity) -> (String, PackageResult) {
        let store = Store::new();
        store.test_run("p", "T");
        store.test_run("p", "T/A");
        store.test_run("p", "T/B");
        store.test_terminal("p", "T/A", Status::Pass, Duration::from_millis(10));
        store.test_output("p", "T/B", "assertion failed\n");
        store.test_terminal("p", "T/B", Status::Fail, Duration::from_millis(20));
        store.test_terminal("p", "T", Status::Fail, Duration::from_millis(30));
        store.package_terminal("p", Status::Fail, Duration::from_millis(30));
        let pkg = store.package_snapshot("p").unwrap();

        let mut buf: Vec<u8> = Vec::new();
        let mut reporter = StreamingReporterBuilder::default()
            .set_show(show)
            .set_verbosity(verbosity)
            .set_colorize(false)
            .build(&mut buf);
        reporter.on_package_complete(&pkg);
        (String::from_utf8(buf).unwrap(), pkg)
    }

    #[test]
    fn failed_subtest_produces_dot_gauge_and_group_summary() {
        let (rendered, _) = render_one_package(ShowFilter::All, Verbosity::Standard);
        assert!(rendered.contains("50% passed"));
        assert!(rendered.contains("Failed: B"));
        assert!(rendered.contains("Passed: A"));
    }

    #[test]
    fn show_filter_subset_of_all() {
        let (all, _) = render_one_package(ShowFilter::All, Verbosity::Standard);
        let (failed_only, _) = render_one_package(ShowFilter::Failed, Verbosity::Standard);
        // Every line in the filtered output should also appear in `all`.
        for line in failed_only.lines() {
            assert!(all.contains(line), "line {line:?} missing from `all` output");
        }
    }

    #[test]
    fn collapsed_filter_has_no_per_test_lines() {
        let (rendered, _) = render_one_package(ShowFilter::Collapsed, Verbosity::Standard);
        assert!(!rendered.contains("50% passed"));
        // Package summary line is still emitted.
        assert!(rendered.contains("failed"));
    }

    #[test]
    fn build_failure_block_has_no_summary_line() {
        let store = Store::new();
        store.package_output("q", "./x.go:5:2: undefined: Foo\n");
        store.package_output("q", "FAIL\tq [build failed]\n");
        store.package_terminal("q", Status::Fail, Duration::ZERO);
        let pkg = store.package_snapshot("q").unwrap();

        let mut buf: Vec<u8> = Vec::new();
        let mut reporter = StreamingReporterBuilder::default().set_colorize(false).build(&mut buf);
        reporter.on_package_complete(&pkg);
        let rendered = String::from_utf8(buf).unwrap();
        assert!(rendered.contains("package failed to build"));
        assert!(rendered.contains("undefined: Foo"));
    }

    #[test]
    fn same_package_never_rendered_twice() {
        let store = Store::new();
        store.package_terminal("p", Status::Pass, Duration::ZERO);
        let pkg = store.package_snapshot("p").unwrap();

        let mut buf: Vec<u8> = Vec::new();
        let mut reporter = StreamingReporterBuilder::default().set_colorize(false).build(&mut buf);
        reporter.on_package_complete(&pkg);
        reporter.on_package_complete(&pkg);
        let rendered = String::from_utf8(buf).unwrap();
        assert_eq!(rendered.matches(&pkg.name).count(), 1);
    }

    #[test]
    fn skip_reason_is_surfaced_on_test_line_and_summary() {
        let store = Store::new();
        store.test_run("p", "TestSkipped");
        store.test_output("p", "TestSkipped", "    pkg_test.go:42: skipping: requires network access\n");
        store.test_terminal("p", "TestSkipped", Status::Skip, Duration::ZERO);
        store.package_terminal("p", Status::Skip, Duration::ZERO);
        let pkg = store.package_snapshot("p").unwrap();

        let mut buf: Vec<u8> = Vec::new();
        let mut reporter = StreamingReporterBuilder::default().set_colorize(false).build(&mut buf);
        reporter.on_package_complete(&pkg);
        let rendered = String::from_utf8(buf).unwrap();

        assert!(
            rendered.contains("SKIP TestSkipped (requires network access)"),
            "rendered output was: {rendered}"
        );
        assert!(
            rendered.contains("all 1 test skipped (requires network access)"),
            "rendered output was: {rendered}"
        );
    }

    #[test]
    fn coverage_annotation_prefers_both_when_available() {
        let store = Store::new();
        store.ensure_package_started("p");
        store.package_output("p", "coverage: 83.3% of statements\n");
        store.package_terminal("p", Status::Pass, Duration::ZERO);
        let mut pkg = store.package_snapshot("p").unwrap();
        pkg.coverage.function_pct = Some("90.0%".to_string());
        assert_eq!(
            StreamingReporter::<Vec<u8>>::coverage_annotation(&pkg),
            Some("statements: 83.3%, functions: 90.0%".to_string())
        );
    }
}
