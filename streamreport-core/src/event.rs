// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The wire schema emitted by the wrapped test runner, one JSON object per
//! line (JSONL).
//!
//! Unknown fields are ignored, missing fields are treated as empty, and
//! unknown [`Action`] values are ignored by the caller rather than rejected
//! at parse time.

use serde::Deserialize;

/// The action tag carried by a single [`Event`].
///
/// Deserializes leniently: any string that isn't one of the known variants
/// falls into [`Action::Unknown`] rather than failing to parse, since
/// unrecognized actions should be ignored, not treated as a malformed line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    Start,
    Run,
    Pause,
    Cont,
    Output,
    Pass,
    Fail,
    Skip,
    Bench,
    /// Some other action tag the runner emitted. Events with this action are
    /// dropped before they reach the [`crate::processor::EventProcessor`].
    Unknown,
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "start" => Action::Start,
            "run" => Action::Run,
            "pause" => Action::Pause,
            "cont" => Action::Cont,
            "output" => Action::Output,
            "pass" => Action::Pass,
            "fail" => Action::Fail,
            "skip" => Action::Skip,
            "bench" => Action::Bench,
            _ => Action::Unknown,
        })
    }
}

/// One parsed line of the runner's JSONL event stream.
///
/// Field names match the wire schema (`Action`, `Package`, `Test`, `Output`,
/// `Elapsed`); all but `Action` are optional on the wire and default to
/// empty/absent here.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub action: Action,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub test: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub elapsed: Option<f64>,
}

impl Event {
    /// Parses a single line of the runner's stdout.
    ///
    /// Lines that don't parse as a well-formed [`Event`] are silently
    /// dropped by the caller (still archived verbatim); this function just
    /// reports the parse error so the caller can make that call.
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// True if this event carries no test name, i.e. it describes the
    /// package as a whole.
    pub fn is_package_level(&self) -> bool {
        self.test.is_empty()
    }

    /// Splits a subtest's full name into `(parent_full_name, leaf_suffix)`,
    /// or `None` if this test has no parent (no `/` in the name).
    pub fn parent_full_name(full_name: &str) -> Option<&str> {
        full_name.rsplit_once('/').map(|(parent, _)| parent)
    }
}
