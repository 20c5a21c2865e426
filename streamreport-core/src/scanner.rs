// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-framed reader over the runner's stdout, tolerant of non-JSON
//! interleaved lines.

use crate::errors::ScannerError;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Frames an async stdout stream into one string per line.
///
/// `EventScanner` does not parse JSON itself — that's the
/// [`crate::processor::EventProcessor`]'s job — it only owns line framing so
/// that archival writes (each line is written verbatim to the archival file
/// before being offered to the processor) happen at a single, well-defined
/// point regardless of what the processor does with the line afterwards.
pub struct EventScanner<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> EventScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Reads the next line, or `None` at EOF.
    ///
    /// Returns every line verbatim, including empty ones: the archive must
    /// match the child's stdout byte-for-byte, so filtering has to happen
    /// downstream of archiving. Empty lines being dropped from the rendered
    /// output falls out naturally once this line reaches the processor — an
    /// empty string fails to parse as an [`crate::event::Event`] and is
    /// silently skipped like any other unparseable line.
    pub async fn next_line(&mut self) -> Result<Option<String>, ScannerError> {
        self.lines.next_line().await.map_err(ScannerError::ReadStdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_lines_and_preserves_empty_ones() {
        // Empty lines must survive this layer so the caller can archive them
        // verbatim; only the processor's JSON parse step drops them.
        let input = b"line one\n\nline two\nline three".to_vec();
        let mut scanner = EventScanner::new(std::io::Cursor::new(input));
        assert_eq!(scanner.next_line().await.unwrap().as_deref(), Some("line one"));
        assert_eq!(scanner.next_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(scanner.next_line().await.unwrap().as_deref(), Some("line two"));
        assert_eq!(scanner.next_line().await.unwrap().as_deref(), Some("line three"));
        assert_eq!(scanner.next_line().await.unwrap(), None);
    }
}
