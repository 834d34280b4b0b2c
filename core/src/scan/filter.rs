/*
 * filter.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Content filters: streaming transforms applied to body chunks in registration order.

use std::fmt;

use bytes::BytesMut;
use log::trace;

/// A streaming transform over body bytes (transfer decoding, charset conversion, saving a copy...).
///
/// `prespace` is the head-room the previous stage advertises in front of its output; the first
/// filter gets the scan buffer's. Each call returns the value to advertise to the next filter;
/// filters that do not care pass it through.
pub trait ContentFilter {
    /// Transform one chunk, appending the result to `out`. Trailing input the filter cannot
    /// decode yet stays in its own state until the next call.
    fn filter(&mut self, input: &[u8], prespace: usize, out: &mut BytesMut) -> usize;

    /// Called once when the body ends, with the previous filter's completion output, so the
    /// filter can flush what it held back.
    fn complete(&mut self, input: &[u8], prespace: usize, out: &mut BytesMut) -> usize {
        self.filter(input, prespace, out)
    }

    /// Forget any held-back state. Called after `complete`.
    fn reset(&mut self) {}
}

/// Identifier returned by `filter_add`. Ids are never reused by one scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u32);

impl FilterId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct FilterEntry {
    id: FilterId,
    filter: Box<dyn ContentFilter>,
}

/// Ordered filter chain.
pub(crate) struct FilterPipeline {
    entries: Vec<FilterEntry>,
    next_id: u32,
    /// Second buffer for chaining: stages alternate between `out` and this.
    scratch: BytesMut,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            scratch: BytesMut::new(),
        }
    }
}

impl FilterPipeline {
    pub fn add(&mut self, filter: Box<dyn ContentFilter>) -> FilterId {
        let id = FilterId(self.next_id);
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        self.entries.push(FilterEntry { id, filter });
        trace!("filter {} added at position {}", id, self.len() - 1);
        id
    }

    /// Remove a filter; unknown ids are ignored.
    pub fn remove(&mut self, id: FilterId) -> Option<Box<dyn ContentFilter>> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        trace!("filter {} removed from position {}", id, pos);
        Some(self.entries.remove(pos).filter)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Run one body chunk through every filter; `out` receives the last stage's output.
    pub fn run(&mut self, input: &[u8], prespace: usize, out: &mut BytesMut) -> usize {
        self.apply(input, prespace, out, false)
    }

    /// End of body: run `complete` through the chain, then reset every filter.
    pub fn complete(&mut self, prespace: usize, out: &mut BytesMut) -> usize {
        let prespace = self.apply(&[], prespace, out, true);
        self.reset_all();
        prespace
    }

    /// Discard held-back state in every filter without producing output.
    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.filter.reset();
        }
    }

    fn apply(&mut self, input: &[u8], mut prespace: usize, out: &mut BytesMut, complete: bool) -> usize {
        out.clear();
        let Some((first, rest)) = self.entries.split_first_mut() else {
            out.extend_from_slice(input);
            return prespace;
        };
        prespace = stage(first, input, prespace, out, complete);
        for entry in rest {
            self.scratch.clear();
            prespace = stage(entry, out, prespace, &mut self.scratch, complete);
            std::mem::swap(out, &mut self.scratch);
        }
        trace!(
            "filter chain: {} bytes in, {} bytes out{}",
            input.len(),
            out.len(),
            if complete { " (complete)" } else { "" }
        );
        prespace
    }
}

fn stage(entry: &mut FilterEntry, input: &[u8], prespace: usize, out: &mut BytesMut, complete: bool) -> usize {
    if complete {
        entry.filter.complete(input, prespace, out)
    } else {
        entry.filter.filter(input, prespace, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl ContentFilter for Upper {
        fn filter(&mut self, input: &[u8], prespace: usize, out: &mut BytesMut) -> usize {
            out.extend(input.iter().map(u8::to_ascii_uppercase));
            prespace
        }
    }

    /// Holds back everything after the last newline until completion.
    #[derive(Default)]
    struct LineBuffer {
        pending: Vec<u8>,
        resets: u32,
    }

    impl ContentFilter for LineBuffer {
        fn filter(&mut self, input: &[u8], _prespace: usize, out: &mut BytesMut) -> usize {
            self.pending.extend_from_slice(input);
            if let Some(nl) = self.pending.iter().rposition(|&b| b == b'\n') {
                out.extend_from_slice(&self.pending[..=nl]);
                self.pending.drain(..=nl);
            }
            0
        }

        fn complete(&mut self, input: &[u8], _prespace: usize, out: &mut BytesMut) -> usize {
            self.pending.extend_from_slice(input);
            out.extend_from_slice(&self.pending);
            self.pending.clear();
            0
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn chain_runs_in_order() {
        let mut chain = FilterPipeline::default();
        chain.add(Box::new(LineBuffer::default()));
        chain.add(Box::new(Upper));
        let mut out = BytesMut::new();
        chain.run(b"ab\ncd", 128, &mut out);
        assert_eq!(&out[..], b"AB\n");
        chain.run(b"e", 128, &mut out);
        assert!(out.is_empty());
        chain.complete(128, &mut out);
        assert_eq!(&out[..], b"CDE");
    }

    #[test]
    fn ids_are_unique_and_removal_is_idempotent() {
        let mut chain = FilterPipeline::default();
        let a = chain.add(Box::new(Upper));
        let b = chain.add(Box::new(Upper));
        assert_eq!(a.get(), 1);
        assert_ne!(a, b);
        assert!(chain.remove(a).is_some());
        assert!(chain.remove(a).is_none());
        assert_eq!(chain.len(), 1);
        let c = chain.add(Box::new(Upper));
        assert!(c.get() > b.get());
    }

    #[test]
    fn prespace_is_threaded_through() {
        struct Shift(usize);
        impl ContentFilter for Shift {
            fn filter(&mut self, input: &[u8], prespace: usize, out: &mut BytesMut) -> usize {
                out.extend_from_slice(input);
                prespace + self.0
            }
        }
        let mut chain = FilterPipeline::default();
        chain.add(Box::new(Shift(1)));
        chain.add(Box::new(Shift(10)));
        let mut out = BytesMut::new();
        assert_eq!(chain.run(b"x", 100, &mut out), 111);
        assert_eq!(&out[..], b"x");
    }
}
