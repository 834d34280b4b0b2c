/*
 * frame.rs
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

//! Frame stack: one frame per open message or multipart, and the boundary matcher over it.

use bytes::BytesMut;
use log::debug;

use super::mempool::{MemPool, PoolRef};
use super::state::ScanState;
use crate::mime::{ContentType, RawHeader};

/// Mailbox message separator, matched like a boundary at the start of a line.
pub(crate) const FROM_SEPARATOR: &[u8] = b"From ";

#[derive(Debug, Clone, Copy)]
struct HeaderRecord {
    name: PoolRef,
    value: PoolRef,
    offset: u64,
}

/// Bookkeeping for one nesting level.
#[derive(Debug)]
pub(crate) struct Frame {
    /// State to report or continue in when this frame is popped.
    pub resume: ScanState,
    /// `--B--` for multiparts, `From ` for the mailbox frame.
    boundary: Option<Vec<u8>>,
    /// Length of the separator (`--B`).
    boundary_len: usize,
    /// Length of the closing form (`--B--`); equal to `boundary_len` when there is none.
    boundary_len_final: usize,
    headers: Vec<HeaderRecord>,
    pool: MemPool,
    pub preface: Option<BytesMut>,
    pub postface: Option<BytesMut>,
    pub from_line: Option<BytesMut>,
    pub content_type: Option<ContentType>,
    /// Lookahead needed to test this and every enclosing boundary; set on push.
    atleast: usize,
    /// Boundary lines of this frame seen so far; preface before the first, postface after the closing one.
    pub boundaries_seen: u32,
    pub closed: bool,
}

impl Frame {
    pub fn new(pool_block_size: usize, pool_threshold: usize) -> Self {
        Self {
            resume: ScanState::Eof,
            boundary: None,
            boundary_len: 0,
            boundary_len_final: 0,
            headers: Vec::new(),
            pool: MemPool::new(pool_block_size, pool_threshold),
            preface: None,
            postface: None,
            from_line: None,
            content_type: None,
            atleast: 1,
            boundaries_seen: 0,
            closed: false,
        }
    }

    /// The synthetic frame that finds "From " lines in a mailbox.
    pub fn separator(pool_block_size: usize, pool_threshold: usize) -> Self {
        let mut frame = Self::new(pool_block_size, pool_threshold);
        frame.boundary = Some(FROM_SEPARATOR.to_vec());
        frame.boundary_len = FROM_SEPARATOR.len();
        frame.boundary_len_final = FROM_SEPARATOR.len();
        frame
    }

    /// Make this a multipart frame delimited by `--boundary` and closed by `--boundary--`.
    pub fn set_multipart_boundary(&mut self, boundary: &str) {
        let mut b = Vec::with_capacity(boundary.len() + 4);
        b.extend_from_slice(b"--");
        b.extend_from_slice(boundary.as_bytes());
        b.extend_from_slice(b"--");
        self.boundary_len = boundary.len() + 2;
        self.boundary_len_final = boundary.len() + 4;
        self.boundary = Some(b);
    }

    /// Separator bytes (`--B` or `From `), if this frame has a boundary.
    pub fn boundary(&self) -> Option<&[u8]> {
        self.boundary.as_deref().map(|b| &b[..self.boundary_len])
    }

    pub fn add_header(&mut self, name: &str, value: &[u8], offset: u64) {
        let name = self.pool.alloc_bytes(name.as_bytes());
        let value = self.pool.alloc_bytes(value);
        self.headers.push(HeaderRecord { name, value, offset });
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Headers in source order.
    pub fn headers(&self) -> impl Iterator<Item = RawHeader<'_>> + '_ {
        self.headers.iter().map(move |h| self.raw_header(h))
    }

    /// First header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<RawHeader<'_>> {
        self.headers().find(|h| h.is_named(name))
    }

    fn raw_header(&self, h: &HeaderRecord) -> RawHeader<'_> {
        // Names are checked to be field-name characters (ASCII) before they are stored.
        let name = std::str::from_utf8(self.pool.get(h.name)).unwrap_or_default();
        RawHeader::new(name, self.pool.get(h.value), h.offset)
    }

    /// Compare the separator at the start of `at`; returns `Some(lastone)` on a match.
    /// `at` ends at the valid end of the buffer, so a short slice never matches.
    fn matches(&self, at: &[u8]) -> Option<bool> {
        let boundary = self.boundary.as_deref()?;
        if !at.starts_with(&boundary[..self.boundary_len]) {
            return None;
        }
        let lastone = self.boundary_len_final > self.boundary_len
            && at.len() >= self.boundary_len_final
            && at[self.boundary_len..self.boundary_len_final]
                == boundary[self.boundary_len..self.boundary_len_final];
        Some(lastone)
    }

    fn release(&mut self) {
        self.headers.clear();
        self.pool.flush(true);
        self.preface = None;
        self.postface = None;
        self.from_line = None;
    }
}

/// A boundary found at the scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundaryHit {
    /// Index of the matching frame in the stack (0 is outermost).
    pub depth: usize,
    /// The closing `--B--` form.
    pub lastone: bool,
}

/// Owned stack of frames; the parent of frame `i` is frame `i - 1`.
#[derive(Debug, Default)]
pub(crate) struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn push(&mut self, mut frame: Frame) {
        let parent = self.frames.last().map(|f| f.atleast).unwrap_or(1);
        frame.atleast = parent.max(frame.boundary_len_final).max(1);
        debug!(
            "push frame {} (boundary {:?}, atleast {}, resume {})",
            self.frames.len(),
            frame.boundary().map(String::from_utf8_lossy),
            frame.atleast,
            frame.resume
        );
        self.frames.push(frame);
    }

    /// Release the top frame and return its resume state.
    pub fn pop(&mut self) -> Option<ScanState> {
        let mut frame = self.frames.pop()?;
        debug!("pop frame {} (resume {})", self.frames.len(), frame.resume);
        frame.release();
        Some(frame.resume)
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost first.
    pub fn iter_innermost(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    /// Lookahead required at a line start before boundaries can be tested.
    pub fn atleast(&self) -> usize {
        self.frames.last().map(|f| f.atleast).unwrap_or(1)
    }

    /// Test `at` against every active boundary, innermost first.
    pub fn check(&self, at: &[u8]) -> Option<BoundaryHit> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, frame)| frame.matches(at).map(|lastone| BoundaryHit { depth, lastone }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart(boundary: &str) -> Frame {
        let mut f = Frame::new(256, 128);
        f.set_multipart_boundary(boundary);
        f
    }

    #[test]
    fn closing_boundary_sets_lastone() {
        let mut stack = FrameStack::default();
        stack.push(multipart("B"));
        assert_eq!(stack.check(b"--B--\n"), Some(BoundaryHit { depth: 0, lastone: true }));
        assert_eq!(stack.check(b"--B\n"), Some(BoundaryHit { depth: 0, lastone: false }));
        assert_eq!(stack.check(b"-B\n"), None);
    }

    #[test]
    fn short_input_never_matches() {
        let mut stack = FrameStack::default();
        stack.push(multipart("LONGBOUNDARY"));
        assert_eq!(stack.check(b"--LONG"), None);
        // Separator present but no room for the closing suffix: not the last one.
        assert_eq!(stack.check(b"--LONGBOUNDARY-"), Some(BoundaryHit { depth: 0, lastone: false }));
    }

    #[test]
    fn innermost_frame_wins() {
        let mut stack = FrameStack::default();
        stack.push(multipart("outer"));
        stack.push(Frame::new(256, 128));
        stack.push(multipart("outer-inner"));
        assert_eq!(stack.check(b"--outer-inner\n").map(|h| h.depth), Some(2));
        assert_eq!(stack.check(b"--outer\n").map(|h| h.depth), Some(0));
        assert_eq!(stack.check(b"--outer--\n"), Some(BoundaryHit { depth: 0, lastone: true }));
    }

    #[test]
    fn atleast_is_inherited() {
        let mut stack = FrameStack::default();
        stack.push(multipart("a-long-outer-boundary"));
        let outer = stack.atleast();
        assert_eq!(outer, "a-long-outer-boundary".len() + 4);
        stack.push(multipart("x"));
        assert_eq!(stack.atleast(), outer);
        stack.push(Frame::new(256, 128));
        assert_eq!(stack.atleast(), outer);
        stack.pop();
        stack.pop();
        stack.pop();
        assert_eq!(stack.atleast(), 1);
    }

    #[test]
    fn plain_frame_never_matches() {
        let mut stack = FrameStack::default();
        stack.push(Frame::new(256, 128));
        assert_eq!(stack.check(b"--anything--\n"), None);
        assert_eq!(stack.check(b"From x\n"), None);
    }

    #[test]
    fn separator_frame_matches_from_lines() {
        let mut stack = FrameStack::default();
        stack.push(Frame::separator(256, 128));
        assert_eq!(stack.check(b"From x\n"), Some(BoundaryHit { depth: 0, lastone: false }));
        assert_eq!(stack.check(b"From: a@b\n"), None);
        assert_eq!(stack.atleast(), 5);
    }

    #[test]
    fn headers_keep_order_and_offsets() {
        let mut frame = Frame::new(32, 16);
        frame.add_header("From", b"a@b", 0);
        frame.add_header("Subject", b"s", 10);
        frame.add_header("X-Long", &[b'x'; 40], 22);
        let names: Vec<_> = frame.headers().map(|h| h.name()).collect();
        assert_eq!(names, ["From", "Subject", "X-Long"]);
        let subject = frame.header("subject").unwrap();
        assert_eq!(subject.value(), b"s");
        assert_eq!(subject.offset(), 10);
        assert_eq!(frame.header("x-long").unwrap().value().len(), 40);
    }
}
