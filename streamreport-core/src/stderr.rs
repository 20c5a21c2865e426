// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A capped, append-only buffer for the runner's captured stderr, guarded
//! by its own mutex.

use std::sync::Mutex;

/// Retention cap for [`ExitDiagnoser`](crate::diagnose::ExitDiagnoser)
/// pattern-matching. This bounds memory use only; it has no effect on the
/// live pass-through of stderr to the UI, which is unbounded.
const CAPTURE_CAP_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
pub(crate) struct StderrCapture {
    inner: Mutex<String>,
}

impl StderrCapture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk, truncating if the cap would be exceeded. Once the
    /// cap is hit, later chunks are silently dropped from the retained copy
    /// -- they are still forwarded live by the caller.
    pub(crate) fn append(&self, chunk: &str) {
        let mut buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if buf.len() >= CAPTURE_CAP_BYTES {
            return;
        }
        let remaining = CAPTURE_CAP_BYTES - buf.len();
        if chunk.len() <= remaining {
            buf.push_str(chunk);
        } else {
            // Take a byte-boundary-safe prefix.
            let mut end = remaining;
            while end > 0 && !chunk.is_char_boundary(end) {
                end -= 1;
            }
            buf.push_str(&chunk[..end]);
        }
    }

    pub(crate) fn snapshot(&self) -> String {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_and_snapshots() {
        let capture = StderrCapture::new();
        capture.append("hello ");
        capture.append("world");
        assert_eq!(capture.snapshot(), "hello world");
    }

    #[test]
    fn stops_growing_past_cap() {
        let capture = StderrCapture::new();
        let chunk = "x".repeat(CAPTURE_CAP_BYTES + 100);
        capture.append(&chunk);
        assert_eq!(capture.snapshot().len(), CAPTURE_CAP_BYTES);
        capture.append("more");
        assert_eq!(capture.snapshot().len(), CAPTURE_CAP_BYTES);
    }
}
