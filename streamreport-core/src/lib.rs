// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core event processing, aggregation, and reporting logic for
//! streamreport, a streaming test-execution reporter that wraps an
//! underlying JSONL-emitting test runner.
//!
//! The four tightly coupled subsystems described by the design are:
//! subprocess lifecycle ([`supervisor`]), the event stream processor
//! ([`scanner`] + [`processor`]), the aggregation model ([`store`]), and
//! exit-code diagnosis ([`diagnose`]). [`reporter`] renders the aggregated
//! state incrementally as the run progresses.

pub mod diagnose;
pub mod errors;
pub mod event;
mod helpers;
mod indenter;
pub mod output;
mod process_group;
pub mod processor;
pub mod reporter;
pub mod scanner;
mod signal;
mod stderr;
pub mod store;
pub mod summary;
pub mod supervisor;
mod time;
mod write_str;

pub use signal::SignalHandlerKind;
