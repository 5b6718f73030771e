// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity line buffer with wrap-around eviction.
//!
//! Used by the direct process backend to retain the most recent output of a
//! child process. Inserts never block; the oldest line is evicted first.

/// Default capacity for per-process output capture.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct RingBuffer {
    lines: Vec<String>,
    capacity: usize,
    /// Index of the next write position once the buffer has wrapped.
    head: usize,
    filled: bool,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            head: 0,
            filled: false,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.filled {
            self.lines[self.head] = line;
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.lines.push(line);
            if self.lines.len() == self.capacity {
                self.filled = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The last `n` lines in insertion order (oldest first).
    ///
    /// Callers get a copy; the buffer keeps accepting writes concurrently
    /// under its own lock.
    pub fn get_lines(&self, n: usize) -> Vec<String> {
        let len = self.lines.len();
        let take = n.min(len);
        let mut out = Vec::with_capacity(take);
        // Oldest entry is at `head` once wrapped, at 0 before that.
        let start = if self.filled { self.head } else { 0 };
        for i in (len - take)..len {
            out.push(self.lines[(start + i) % len].clone());
        }
        out
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
#[path = "ringbuf_tests.rs"]
mod tests;
