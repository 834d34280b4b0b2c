/*
 * mod.rs
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

//! Streaming RFC 822 / MIME scanner.
//!
//! [`MimeScanner`] pulls raw message octets from a [`ScanSource`] and reports structural
//! transitions one [`step`](MimeScanner::step) at a time: a header block was found, a body
//! chunk is available, a multipart boundary was crossed, an embedded message was entered or
//! left. Nothing but the current header block and the multipart preface/postface is kept in
//! memory; body bytes are handed out in chunks borrowed from the scan buffer.
//!
//! ```ignore
//! let mut scanner = MimeScanner::new(&message[..]);
//! loop {
//!     let step = scanner.step()?;
//!     match step.state() {
//!         ScanState::Body => body.extend_from_slice(step.data().unwrap_or_default()),
//!         ScanState::Eof => break,
//!         _ => {}
//!     }
//! }
//! ```

mod buffer;
mod error;
mod filter;
mod frame;
mod mempool;
mod options;
mod state;

use std::io::{self, SeekFrom};
use std::ops::Range;

use bytes::BytesMut;
use log::{debug, trace, warn};

pub use buffer::{ReadSource, ScanSource, SeekableSource};
pub use error::ScanError;
pub use filter::{ContentFilter, FilterId};
pub use mempool::{MemPool, PoolRef};
pub use options::{ScannerOptions, DEFAULT_POOL_BLOCK_SIZE, DEFAULT_POOL_THRESHOLD, DEFAULT_READ_SIZE};
pub use state::ScanState;

use buffer::{find_newline, ScanBuffer, HEAD_ROOM};
use filter::FilterPipeline;
use frame::{BoundaryHit, Frame, FrameStack};

use crate::mime::{
    is_lwsp, is_usable_boundary, split_header_line, ContentType, ContentTypeDecoder, RawHeader,
    Rfc2045Decoder,
};

/// One reported transition: the new state, and the chunk that goes with it (body and
/// pre-From content only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<'a> {
    state: ScanState,
    data: Option<&'a [u8]>,
}

impl<'a> Step<'a> {
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn data(&self) -> Option<&'a [u8]> {
        self.data
    }
}

/// Chunk retained for the last reported step.
#[derive(Debug, Clone)]
enum Chunk {
    /// Unfiltered bytes in the scan buffer.
    Raw(Range<usize>),
    /// Filter chain output, in `MimeScanner::output`.
    Filtered,
}

/// Result of scanning content at the current position.
enum Content {
    /// Bytes up to (not including) the next boundary line or refill point.
    Data(Range<usize>),
    /// A boundary line starts at the cursor; it is not consumed.
    Boundary(BoundaryHit),
    /// End of data.
    End,
}

enum Flow {
    Emit,
    Continue,
}

/// Work begun on a separator or boundary line, finished before any further content is
/// scanned. It survives a source error, so the step after recovery picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandOff {
    /// Rest of a "From " line, saved as the from-line.
    FromLine,
    /// Rest of a boundary line that opens a part.
    Boundary,
    /// Rest of the closing boundary line.
    Closing,
    /// Header block of the part after a boundary.
    PartHeaders,
}

/// Pull-based scanner over one message or mailbox.
pub struct MimeScanner<S> {
    buffer: ScanBuffer<S>,
    frames: FrameStack,
    filters: FilterPipeline,
    decoder: Box<dyn ContentTypeDecoder>,
    options: ScannerOptions,
    state: ScanState,
    /// Pending `unstep` count.
    replay: u32,
    chunk: Option<Chunk>,
    output: BytesMut,
    /// The scan position is inside a line, so boundaries cannot start there.
    midline: bool,
    hand_off: Option<HandOff>,
    header_buf: Vec<u8>,
    header_start: Option<u64>,
    start_of_from: Option<u64>,
    start_of_headers: Option<u64>,
    start_of_boundary: Option<u64>,
    /// `complete` already ran for the body being finished.
    body_completed: bool,
    io_error: Option<io::ErrorKind>,
}

impl<S: ScanSource> MimeScanner<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ScannerOptions::default())
    }

    pub fn with_options(source: S, options: ScannerOptions) -> Self {
        Self {
            buffer: ScanBuffer::new(source, options.read_size),
            frames: FrameStack::default(),
            filters: FilterPipeline::default(),
            decoder: Box::new(Rfc2045Decoder),
            options,
            state: ScanState::Initial,
            replay: 0,
            chunk: None,
            output: BytesMut::new(),
            midline: false,
            hand_off: None,
            header_buf: Vec::new(),
            header_start: None,
            start_of_from: None,
            start_of_headers: None,
            start_of_boundary: None,
            body_completed: false,
            io_error: None,
        }
    }

    /// Start over on a new source, keeping the buffer allocation, options and filters.
    /// Returns the previous source.
    pub fn init_with_source(&mut self, source: S) -> S {
        self.frames.clear();
        self.filters.reset_all();
        self.reset_position();
        self.hand_off = None;
        self.state = ScanState::Initial;
        self.start_of_from = None;
        self.start_of_headers = None;
        self.start_of_boundary = None;
        self.buffer.replace_source(source)
    }

    /// Replace the Content-Type decoder used to classify parts.
    pub fn set_content_type_decoder<D: ContentTypeDecoder + 'static>(&mut self, decoder: D) {
        self.decoder = Box::new(decoder);
    }

    /// Treat the input as a mailbox of messages separated by "From " lines.
    pub fn scan_from(&mut self, scan_from: bool) {
        self.options.scan_from = scan_from;
    }

    /// Report content before the first "From " line as `PreFrom` chunks instead of skipping it.
    pub fn scan_pre_from(&mut self, scan_pre_from: bool) {
        self.options.scan_pre_from = scan_pre_from;
    }

    /// Advance to the next transition.
    ///
    /// After an `unstep` the previous transition is reported again without scanning.
    /// After a source error every call fails with [`ScanError::Halted`] until
    /// [`seek`](Self::seek) or [`init_with_source`](Self::init_with_source).
    pub fn step(&mut self) -> Result<Step<'_>, ScanError> {
        if self.replay > 0 {
            self.replay -= 1;
            trace!("replaying {}", self.state);
            return Ok(self.current_step());
        }
        if let Some(kind) = self.io_error {
            return Err(ScanError::Halted(kind));
        }
        self.chunk = None;
        loop {
            match self.dispatch() {
                Ok(Flow::Emit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    if let ScanError::Io(ref io) = e {
                        warn!("scan halted in {} at offset {}: {}", self.state, self.tell(), io);
                        self.io_error = Some(io.kind());
                    }
                    return Err(e);
                }
            }
        }
        debug!(
            "{} at offset {} (depth {})",
            self.state,
            self.tell(),
            self.frames.depth()
        );
        Ok(self.current_step())
    }

    /// Make the next `step` report the current transition again. Calls accumulate.
    pub fn unstep(&mut self) {
        self.replay += 1;
    }

    /// Abandon the current part: its frame is popped and scanning continues in the
    /// enclosing state.
    pub fn drop_step(&mut self) {
        self.replay = 0;
        self.chunk = None;
        self.hand_off = None;
        if self.state == ScanState::Body {
            self.filters.reset_all();
        }
        self.body_completed = false;
        let from = self.state;
        self.state = match self.state {
            ScanState::Eof | ScanState::Initial => ScanState::Initial,
            ScanState::From | ScanState::PreFrom => {
                self.frames.pop();
                ScanState::Initial
            }
            _ => match self.frames.pop() {
                Some(resume) => resume.opening(),
                None => {
                    warn!("drop_step in {} with no open frame", from);
                    ScanState::Initial
                }
            },
        };
        debug!("dropped {}, now {}", from, self.state);
    }

    /// Prime the scanner to parse a body whose headers were read elsewhere: push a frame
    /// delimited by `boundary` and continue in `state` (normally `Multipart`).
    pub fn push_state(&mut self, state: ScanState, boundary: &str) {
        let mut frame = Frame::new(self.options.pool_block_size, self.options.pool_threshold);
        if is_usable_boundary(boundary) {
            frame.set_multipart_boundary(boundary);
        } else {
            warn!("push_state with unusable boundary {:?}", boundary);
        }
        self.frames.push(frame);
        self.state = state;
        self.replay = 0;
        self.chunk = None;
        self.hand_off = None;
    }

    /// Reposition the source. Buffered input, the pending chunk and any halted error are
    /// discarded; the state and frames are kept.
    ///
    /// To recover from a source error, seek back to `tell_start_headers()` (error while
    /// reading a header block), `tell_start_from()` (a "From " line) or `tell()`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, ScanError> {
        let offset = self.buffer.seek(pos)?;
        self.reset_position();
        debug!("seek to {} in {}", offset, self.state);
        Ok(offset)
    }

    /// Absolute offset of the next unscanned byte.
    pub fn tell(&self) -> u64 {
        self.buffer.tell()
    }

    /// Offset of the first byte of the current header block.
    pub fn tell_start_headers(&self) -> Option<u64> {
        self.start_of_headers
    }

    /// Offset of the current "From " line, when scanning a mailbox.
    pub fn tell_start_from(&self) -> Option<u64> {
        self.start_of_from
    }

    /// Offset of the last multipart boundary line.
    pub fn tell_start_boundary(&self) -> Option<u64> {
        self.start_of_boundary
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    /// Header fields of the current part, in source order. Valid until the next step.
    pub fn headers_raw(&self) -> impl Iterator<Item = RawHeader<'_>> + '_ {
        self.frames.top().into_iter().flat_map(|f| f.headers())
    }

    /// First header of the current part with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<RawHeader<'_>> {
        self.frames.top()?.header(name)
    }

    /// Decoded Content-Type of the current part (the default when it has none).
    pub fn content_type(&self) -> Option<&ContentType> {
        self.frames.top()?.content_type.as_ref()
    }

    /// The "From " line of the current mailbox message, line break included.
    pub fn from_line(&self) -> Option<&[u8]> {
        self.frames
            .iter_innermost()
            .find_map(|f| f.from_line.as_deref())
    }

    /// Bytes before the first boundary line. Only while reporting `MultipartEnd`.
    pub fn preface(&self) -> Option<&[u8]> {
        if self.state != ScanState::MultipartEnd {
            return None;
        }
        self.frames.top()?.preface.as_deref()
    }

    /// Bytes after the closing boundary line. Only while reporting `MultipartEnd`.
    pub fn postface(&self) -> Option<&[u8]> {
        if self.state != ScanState::MultipartEnd {
            return None;
        }
        self.frames.top()?.postface.as_deref()
    }

    /// Chunk of the last reported step.
    pub fn data(&self) -> Option<&[u8]> {
        match self.chunk.as_ref()? {
            Chunk::Raw(range) => Some(&self.buffer.bytes()[range.clone()]),
            Chunk::Filtered => Some(&self.output[..]),
        }
    }

    /// Append a filter to the body chain.
    pub fn filter_add<F: ContentFilter + 'static>(&mut self, filter: F) -> FilterId {
        self.filters.add(Box::new(filter))
    }

    /// Remove a filter; returns it, or None if the id is unknown.
    pub fn filter_remove(&mut self, id: FilterId) -> Option<Box<dyn ContentFilter>> {
        self.filters.remove(id)
    }

    /// Kind of the source error that halted scanning, if any.
    pub fn last_io_error(&self) -> Option<io::ErrorKind> {
        self.io_error
    }

    pub fn source(&self) -> &S {
        self.buffer.source()
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.buffer.source_mut()
    }

    pub fn into_source(self) -> S {
        self.buffer.into_source()
    }

    fn current_step(&self) -> Step<'_> {
        Step {
            state: self.state,
            data: self.data(),
        }
    }

    fn reset_position(&mut self) {
        self.replay = 0;
        self.chunk = None;
        self.midline = false;
        self.header_buf.clear();
        self.header_start = None;
        self.body_completed = false;
        self.io_error = None;
    }

    fn new_frame(&self) -> Frame {
        Frame::new(self.options.pool_block_size, self.options.pool_threshold)
    }

    /// One transition of the automaton. `Continue` means the state changed without anything
    /// to report.
    fn dispatch(&mut self) -> Result<Flow, ScanError> {
        if self.hand_off.is_some() {
            return self.finish_hand_off();
        }
        match self.state {
            ScanState::Initial => {
                if self.options.scan_from {
                    let frame = Frame::separator(self.options.pool_block_size, self.options.pool_threshold);
                    self.frames.push(frame);
                    self.state = ScanState::PreFrom;
                    Ok(Flow::Continue)
                } else {
                    self.start_of_from = None;
                    self.enter_headers(ScanState::Eof)?;
                    Ok(Flow::Emit)
                }
            }
            ScanState::PreFrom => match self.scan_content()? {
                Content::Data(range) => {
                    if self.options.scan_pre_from {
                        self.chunk = Some(Chunk::Raw(range));
                        Ok(Flow::Emit)
                    } else {
                        Ok(Flow::Continue)
                    }
                }
                Content::Boundary(_) => {
                    self.start_of_from = Some(self.tell());
                    self.hand_off = Some(HandOff::FromLine);
                    self.finish_hand_off()
                }
                Content::End => {
                    self.frames.pop();
                    self.state = ScanState::Eof;
                    Ok(Flow::Emit)
                }
            },
            ScanState::From => {
                let resume = if self.options.scan_from {
                    ScanState::FromEnd
                } else {
                    ScanState::Eof
                };
                self.enter_headers(resume)?;
                Ok(Flow::Emit)
            }
            ScanState::Header => {
                self.state = ScanState::Body;
                Ok(Flow::Continue)
            }
            ScanState::Body => self.scan_body(),
            ScanState::Multipart => self.scan_multipart(),
            ScanState::Message => {
                self.enter_headers(ScanState::MessageEnd)?;
                Ok(Flow::Emit)
            }
            ScanState::FromEnd
            | ScanState::BodyEnd
            | ScanState::MultipartEnd
            | ScanState::MessageEnd => {
                let resume = match self.frames.pop() {
                    Some(resume) => resume,
                    None => panic!("frame stack underflow leaving {}", self.state),
                };
                self.state = resume;
                if resume.is_end() {
                    Ok(Flow::Emit)
                } else {
                    Ok(Flow::Continue)
                }
            }
            ScanState::Eof => Ok(Flow::Emit),
        }
    }

    fn scan_body(&mut self) -> Result<Flow, ScanError> {
        match self.scan_content()? {
            Content::Data(range) => {
                if self.filters.is_empty() {
                    self.chunk = Some(Chunk::Raw(range));
                    return Ok(Flow::Emit);
                }
                self.filters
                    .run(&self.buffer.bytes()[range], HEAD_ROOM, &mut self.output);
                if self.output.is_empty() {
                    Ok(Flow::Continue)
                } else {
                    self.chunk = Some(Chunk::Filtered);
                    Ok(Flow::Emit)
                }
            }
            Content::Boundary(_) | Content::End => {
                if !self.body_completed && !self.filters.is_empty() {
                    self.body_completed = true;
                    self.filters.complete(HEAD_ROOM, &mut self.output);
                    if !self.output.is_empty() {
                        self.chunk = Some(Chunk::Filtered);
                        return Ok(Flow::Emit);
                    }
                }
                self.body_completed = false;
                self.state = ScanState::BodyEnd;
                Ok(Flow::Emit)
            }
        }
    }

    fn scan_multipart(&mut self) -> Result<Flow, ScanError> {
        let content = self.scan_content()?;
        let own = self.frames.depth().checked_sub(1);
        let Some(frame) = self.frames.top_mut() else {
            panic!("multipart scan with no open frame");
        };
        match content {
            Content::Data(range) => {
                let bytes = &self.buffer.bytes()[range];
                let side = if frame.closed {
                    &mut frame.postface
                } else if frame.boundaries_seen == 0 {
                    &mut frame.preface
                } else {
                    trace!("discarding {} bytes between parts", bytes.len());
                    return Ok(Flow::Continue);
                };
                side.get_or_insert_with(BytesMut::new).extend_from_slice(bytes);
                Ok(Flow::Continue)
            }
            Content::Boundary(hit) if Some(hit.depth) == own && !frame.closed => {
                frame.boundaries_seen += 1;
                frame.closed = hit.lastone;
                self.start_of_boundary = Some(self.buffer.tell());
                self.hand_off = Some(if hit.lastone {
                    HandOff::Closing
                } else {
                    HandOff::Boundary
                });
                self.finish_hand_off()
            }
            Content::Boundary(_) | Content::End => {
                self.state = ScanState::MultipartEnd;
                Ok(Flow::Emit)
            }
        }
    }

    /// Run the pending hand-off to completion. On error it stays pending; a retry re-reads
    /// from wherever the source was repositioned.
    fn finish_hand_off(&mut self) -> Result<Flow, ScanError> {
        while let Some(hand_off) = self.hand_off {
            match hand_off {
                HandOff::FromLine => {
                    // Back at the start of the line: drop what an interrupted read saved.
                    if Some(self.tell()) == self.start_of_from {
                        if let Some(frame) = self.frames.top_mut() {
                            frame.from_line = None;
                        }
                    }
                    self.skip_line(true)?;
                    if let Some(frame) = self.frames.top_mut() {
                        frame.resume = ScanState::Initial;
                    }
                    self.hand_off = None;
                    self.state = ScanState::From;
                    return Ok(Flow::Emit);
                }
                HandOff::Closing => {
                    self.skip_line(false)?;
                    self.hand_off = None;
                    return Ok(Flow::Continue);
                }
                HandOff::Boundary => {
                    self.skip_line(false)?;
                    self.hand_off = Some(HandOff::PartHeaders);
                }
                HandOff::PartHeaders => {
                    self.enter_headers(ScanState::Multipart)?;
                    self.hand_off = None;
                    return Ok(Flow::Emit);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Scan a header block into a new frame, classify it and make it current.
    fn enter_headers(&mut self, resume: ScanState) -> Result<(), ScanError> {
        self.start_of_headers = Some(self.tell());
        let mut frame = self.scan_header()?;
        frame.resume = resume;
        let state = self.classify(&mut frame);
        debug!(
            "header block at {:?}: {} fields, {}",
            self.start_of_headers,
            frame.header_count(),
            state
        );
        self.frames.push(frame);
        self.state = state;
        Ok(())
    }

    fn classify(&self, frame: &mut Frame) -> ScanState {
        let (decoded, mangled) = match frame.header("content-type") {
            Some(h) => {
                let ct = self.decoder.decode(h.value());
                let mangled = ct
                    .as_ref()
                    .and_then(ContentType::boundary)
                    .is_some_and(|b| !boundary_in_source(h.value(), b));
                (ct, mangled)
            }
            None => (None, false),
        };
        let in_digest = self
            .frames
            .top()
            .and_then(|parent| parent.content_type.as_ref())
            .is_some_and(|ct| ct.is_mime_type("multipart", "digest"));
        let (content_type, state) = match decoded {
            None if in_digest => (ContentType::message_rfc822(), ScanState::Message),
            None => (ContentType::text_plain(), ScanState::Header),
            Some(ct) if ct.is_primary_type("multipart") => {
                let state = if ct.is_sub_type("signed") {
                    ScanState::Header
                } else if let Some(boundary) = ct
                    .boundary()
                    .filter(|b| !mangled && is_usable_boundary(b))
                {
                    frame.set_multipart_boundary(boundary);
                    ScanState::Multipart
                } else {
                    warn!(
                        "multipart/{} without usable boundary, scanning as a single part",
                        ct.get_sub_type()
                    );
                    ScanState::Header
                };
                (ct, state)
            }
            Some(ct) if ct.is_mime_type("message", "rfc822") || ct.is_mime_type("message", "news") => {
                (ct, ScanState::Message)
            }
            Some(ct) => (ct, ScanState::Header),
        };
        frame.content_type = Some(content_type);
        state
    }

    /// Read header lines until a blank line, an enclosing boundary or end of data.
    fn scan_header(&mut self) -> Result<Frame, ScanError> {
        let mut frame = self.new_frame();
        self.header_buf.clear();
        self.header_start = None;
        self.buffer.set_atleast(self.frames.atleast().max(2));
        loop {
            if self.buffer.fill()? == 0 {
                break;
            }
            let p = self.buffer.cursor();
            let end = self.buffer.end();
            if !self.midline {
                let bytes = self.buffer.bytes();
                let at_boundary = self.frames.check(&bytes[p..end]).is_some();
                let first = bytes[p];
                let blank = match first {
                    b'\n' => Some(1),
                    b'\r' if p + 1 < end && bytes[p + 1] == b'\n' => Some(2),
                    _ => None,
                };
                if at_boundary || !is_lwsp(first) {
                    self.flush_header(&mut frame);
                }
                if at_boundary {
                    return Ok(frame);
                }
                if let Some(len) = blank {
                    self.buffer.set_cursor(p + len);
                    return Ok(frame);
                }
                if self.header_buf.is_empty() {
                    self.header_start = Some(self.buffer.offset_of(p));
                }
            }
            let nl = find_newline(self.buffer.bytes(), p);
            let stop = if nl < end { nl + 1 } else { end };
            self.header_buf
                .extend_from_slice(&self.buffer.bytes()[p..stop]);
            self.buffer.set_cursor(stop);
            self.midline = nl >= end;
        }
        // Truncated block: keep what was read, unterminated last line included.
        self.flush_header(&mut frame);
        self.midline = false;
        Ok(frame)
    }

    fn flush_header(&mut self, frame: &mut Frame) {
        if self.header_buf.is_empty() {
            return;
        }
        let offset = self.header_start.take().unwrap_or_default();
        let mut line = &self.header_buf[..];
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        match split_header_line(line) {
            Some((name, value)) => frame.add_header(name, value, offset),
            None => warn!(
                "skipping invalid header line at offset {}: {:?}",
                offset,
                String::from_utf8_lossy(line)
            ),
        }
        self.header_buf.clear();
    }

    /// Consume the rest of the current line, newline included.
    fn skip_line(&mut self, save_from_line: bool) -> Result<(), ScanError> {
        self.buffer.set_atleast(1);
        loop {
            if self.buffer.fill()? == 0 {
                break;
            }
            let p = self.buffer.cursor();
            let end = self.buffer.end();
            let bytes = self.buffer.bytes();
            let nl = find_newline(bytes, p);
            let stop = if nl < end { nl + 1 } else { end };
            if save_from_line {
                if let Some(frame) = self.frames.top_mut() {
                    frame
                        .from_line
                        .get_or_insert_with(BytesMut::new)
                        .extend_from_slice(&bytes[p..stop]);
                }
            }
            self.buffer.set_cursor(stop);
            if nl < end {
                break;
            }
        }
        self.midline = false;
        Ok(())
    }

    /// Scan content up to the next boundary line of any open frame.
    ///
    /// Boundaries are only tested at line starts with at least the stack's lookahead
    /// available, so a boundary split across reads is never missed.
    fn scan_content(&mut self) -> Result<Content, ScanError> {
        let atleast = self.frames.atleast();
        self.buffer.set_atleast(atleast);
        loop {
            if self.buffer.fill()? == 0 {
                return Ok(Content::End);
            }
            let start = self.buffer.cursor();
            let end = self.buffer.end();
            let eof = self.buffer.is_eof();
            let bytes = self.buffer.bytes();
            let mut p = start;
            while p < end {
                if !self.midline {
                    if !eof && end - p < atleast {
                        break;
                    }
                    if let Some(hit) = self.frames.check(&bytes[p..end]) {
                        if p > start {
                            self.buffer.set_cursor(p);
                            return Ok(Content::Data(start..p));
                        }
                        return Ok(Content::Boundary(hit));
                    }
                }
                let nl = find_newline(bytes, p);
                if nl < end {
                    p = nl + 1;
                    self.midline = false;
                } else {
                    p = end;
                    self.midline = true;
                }
            }
            if p > start {
                self.buffer.set_cursor(p);
                return Ok(Content::Data(start..p));
            }
            // Line start with too little lookahead: go round and read more.
        }
    }
}

/// False when decoding replaced undecodable octets of the boundary, so its bytes can no
/// longer match the raw boundary lines.
fn boundary_in_source(raw: &[u8], boundary: &str) -> bool {
    !boundary.contains(char::REPLACEMENT_CHARACTER)
        || memchr::memmem::find(raw, boundary.as_bytes()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(input: &[u8], configure: impl FnOnce(&mut MimeScanner<&[u8]>)) -> Vec<ScanState> {
        let mut scanner = MimeScanner::new(input);
        configure(&mut scanner);
        let mut out = Vec::new();
        loop {
            let state = scanner.step().unwrap().state();
            out.push(state);
            if state == ScanState::Eof {
                return out;
            }
        }
    }

    #[test]
    fn single_part_message() {
        use ScanState::*;
        let got = states(b"Subject: s\n\nbody\n", |_| {});
        assert_eq!(got, [Header, Body, BodyEnd, Eof]);
    }

    #[test]
    fn headers_then_body_bytes() {
        let mut scanner = MimeScanner::new(&b"To: a@b\r\nSubject:  two\r\n words\r\n\r\nline\r\n"[..]);
        assert_eq!(scanner.step().unwrap().state(), ScanState::Header);
        let headers: Vec<_> = scanner.headers_raw().map(|h| (h.name(), h.value().to_vec())).collect();
        assert_eq!(
            headers,
            [("To", b"a@b".to_vec()), ("Subject", b"two\r\n words".to_vec())]
        );
        assert_eq!(scanner.header("subject").unwrap().offset(), 9);
        assert_eq!(scanner.tell_start_headers(), Some(0));
        let body = scanner.step().unwrap();
        assert_eq!(body.state(), ScanState::Body);
        assert_eq!(body.data(), Some(&b"line\r\n"[..]));
    }

    #[test]
    fn default_content_type_is_text_plain() {
        let mut scanner = MimeScanner::new(&b"Subject: s\n\n"[..]);
        scanner.step().unwrap();
        assert!(scanner.content_type().unwrap().is_mime_type("text", "plain"));
    }

    #[test]
    fn invalid_header_lines_are_skipped() {
        let mut scanner = MimeScanner::new(&b"Good: 1\nno colon\nAlso-Good: 2\n\n"[..]);
        scanner.step().unwrap();
        let names: Vec<_> = scanner.headers_raw().map(|h| h.name()).collect();
        assert_eq!(names, ["Good", "Also-Good"]);
    }

    #[test]
    fn eof_is_sticky() {
        let mut scanner = MimeScanner::new(&b""[..]);
        assert_eq!(scanner.step().unwrap().state(), ScanState::Header);
        while scanner.step().unwrap().state() != ScanState::Eof {}
        assert_eq!(scanner.step().unwrap().state(), ScanState::Eof);
        assert_eq!(scanner.depth(), 0);
    }

    #[test]
    fn preface_only_in_multipart_end() {
        let input = b"Content-Type: multipart/mixed; boundary=B\n\npre\n--B\n\nx\n--B--\n";
        let mut scanner = MimeScanner::new(&input[..]);
        assert_eq!(scanner.step().unwrap().state(), ScanState::Multipart);
        assert!(scanner.preface().is_none());
        while scanner.step().unwrap().state() != ScanState::MultipartEnd {}
        assert_eq!(scanner.preface(), Some(&b"pre\n"[..]));
        assert!(scanner.postface().is_none());
    }

    #[test]
    fn drop_step_mapping() {
        let input = b"Content-Type: multipart/mixed; boundary=B\n\n--B\n\nx\n--B--\n";
        let mut scanner = MimeScanner::new(&input[..]);
        assert_eq!(scanner.step().unwrap().state(), ScanState::Multipart);
        assert_eq!(scanner.step().unwrap().state(), ScanState::Header);
        // Child resumes its parent: Multipart.
        scanner.drop_step();
        assert_eq!(scanner.state(), ScanState::Multipart);
        assert_eq!(scanner.depth(), 1);
        scanner.drop_step();
        assert_eq!(scanner.state(), ScanState::Initial);
        assert_eq!(scanner.depth(), 0);
        scanner.drop_step();
        assert_eq!(scanner.state(), ScanState::Initial);
    }

    #[test]
    #[should_panic(expected = "frame stack underflow")]
    fn end_state_without_frame_panics() {
        let mut scanner = MimeScanner::new(&b"Subject: s\n\n"[..]);
        scanner.step().unwrap();
        scanner.step().unwrap();
        assert_eq!(scanner.step().unwrap().state(), ScanState::BodyEnd);
        scanner.frames.clear();
        let _ = scanner.step();
    }
}
