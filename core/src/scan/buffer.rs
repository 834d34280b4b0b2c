/*
 * buffer.rs
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

//! Refillable scan buffer over a pull source, with a lookahead guarantee and a newline sentinel.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use log::trace;

use super::error::ScanError;

/// Head-room advertised to the first body filter.
pub(crate) const HEAD_ROOM: usize = 128;

/// A byte-oriented pull source. A zero-byte read means end of data.
pub trait ScanSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Reposition the source. Sources that cannot seek keep the default, which fails with
    /// `ErrorKind::Unsupported`.
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "source is not seekable",
        ))
    }
}

impl<S: ScanSource + ?Sized> ScanSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        (**self).seek(pos)
    }
}

impl ScanSource for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }
}

impl<T: AsRef<[u8]>> ScanSource for Cursor<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(self, pos)
    }
}

impl ScanSource for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(self, pos)
    }
}

/// Any reader, without seeking (pipes, sockets, decompressors).
#[derive(Debug)]
pub struct ReadSource<R>(pub R);

impl<R: Read> ScanSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Any reader that can also seek.
#[derive(Debug)]
pub struct SeekableSource<R>(pub R);

impl<R: Read + Seek> ScanSource for SeekableSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

/// Scan buffer: `data[cursor..end]` is unread input, `data[end]` is always `\n`.
pub(crate) struct ScanBuffer<S> {
    source: S,
    data: Vec<u8>,
    cursor: usize,
    end: usize,
    /// Absolute source offset of `data[0]`.
    base: u64,
    eof: bool,
    atleast: usize,
    read_size: usize,
}

impl<S: ScanSource> ScanBuffer<S> {
    pub fn new(source: S, read_size: usize) -> Self {
        let read_size = read_size.max(1);
        let mut data = vec![0u8; read_size + 1];
        data[0] = b'\n';
        Self {
            source,
            data,
            cursor: 0,
            end: 0,
            base: 0,
            eof: false,
            atleast: 1,
            read_size,
        }
    }

    pub fn set_atleast(&mut self, atleast: usize) {
        self.atleast = atleast.max(1);
    }

    /// Make at least `atleast` unread bytes available unless the source is exhausted.
    /// Returns the number of unread bytes. On error nothing is marked as end of data.
    pub fn fill(&mut self) -> io::Result<usize> {
        let avail = self.end - self.cursor;
        if self.eof || avail >= self.atleast {
            return Ok(avail);
        }
        if self.cursor > 0 {
            self.data.copy_within(self.cursor..self.end, 0);
            self.base += self.cursor as u64;
            self.end = avail;
            self.cursor = 0;
        }
        let want = self.atleast + self.read_size + 1;
        if self.data.len() < want {
            self.data.resize(want, 0);
        }
        while !self.eof && self.end < self.atleast {
            let limit = (self.end + self.read_size).min(self.data.len() - 1);
            let n = self.source.read(&mut self.data[self.end..limit])?;
            let n = n.min(limit - self.end);
            trace!(
                "scan buffer read {} bytes at offset {} ({} kept)",
                n,
                self.base + self.end as u64,
                avail
            );
            if n == 0 {
                self.eof = true;
            } else {
                self.end += n;
            }
        }
        self.data[self.end] = b'\n';
        Ok(self.end - self.cursor)
    }

    /// Buffer contents up to and including the sentinel, indexed like `cursor()` and `end()`.
    /// Indices stay meaningful until the next `fill`.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..=self.end]
    }

    /// Unread bytes.
    #[cfg(test)]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.cursor..self.end]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Move the cursor to absolute buffer index `pos` (between cursor and end).
    pub fn set_cursor(&mut self, pos: usize) {
        debug_assert!(pos >= self.cursor && pos <= self.end);
        self.cursor = pos;
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Absolute source offset of buffer index `pos`.
    pub fn offset_of(&self, pos: usize) -> u64 {
        self.base + pos as u64
    }

    pub fn tell(&self) -> u64 {
        self.base + self.cursor as u64
    }

    /// Reposition the source and discard buffered input. `SeekFrom::Current` is relative to
    /// `tell()`, not to the source's read-ahead position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, ScanError> {
        let pos = match pos {
            SeekFrom::Current(delta) => SeekFrom::Current(delta - (self.end - self.cursor) as i64),
            other => other,
        };
        let offset = self.source.seek(pos).map_err(|e| {
            if e.kind() == io::ErrorKind::Unsupported {
                ScanError::Unseekable
            } else {
                ScanError::Io(e)
            }
        })?;
        self.reset_to(offset);
        Ok(offset)
    }

    /// Swap in a new source positioned at offset 0.
    pub fn replace_source(&mut self, source: S) -> S {
        let old = std::mem::replace(&mut self.source, source);
        self.reset_to(0);
        old
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn reset_to(&mut self, offset: u64) {
        self.base = offset;
        self.cursor = 0;
        self.end = 0;
        self.eof = false;
        self.data[0] = b'\n';
    }
}

/// Index of the first `\n` in `bytes` at or after `from`. The sentinel guarantees a hit; a
/// result equal to `bytes.len() - 1` is the sentinel, not input.
#[inline]
pub(crate) fn find_newline(bytes: &[u8], from: usize) -> usize {
    memchr::memchr(b'\n', &bytes[from..])
        .map(|i| from + i)
        .unwrap_or(bytes.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns at most `max` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        max: usize,
    }

    impl ScanSource for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.max).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn fill_meets_atleast_with_short_reads() {
        let mut buf = ScanBuffer::new(Trickle { data: b"abcdefghij", max: 1 }, 2);
        buf.set_atleast(5);
        assert_eq!(buf.fill().unwrap(), 5);
        assert_eq!(buf.unread(), b"abcde");
        assert_eq!(buf.bytes().last(), Some(&b'\n'));
    }

    #[test]
    fn fill_keeps_unread_bytes_and_tracks_offset() {
        let mut buf = ScanBuffer::new(&b"0123456789"[..], 4);
        buf.set_atleast(1);
        assert_eq!(buf.fill().unwrap(), 4);
        buf.set_cursor(3);
        assert_eq!(buf.tell(), 3);
        buf.set_atleast(3);
        buf.fill().unwrap();
        assert_eq!(buf.unread(), b"3456");
        assert_eq!(buf.tell(), 3);
        assert_eq!(buf.offset_of(buf.cursor()), 3);
    }

    #[test]
    fn eof_is_reported_once_drained() {
        let mut buf = ScanBuffer::new(&b"ab"[..], 16);
        buf.set_atleast(8);
        assert_eq!(buf.fill().unwrap(), 2);
        assert!(buf.is_eof());
        buf.set_cursor(buf.end());
        assert_eq!(buf.fill().unwrap(), 0);
    }

    #[test]
    fn unseekable_source() {
        let mut buf = ScanBuffer::new(ReadSource(&b"abc"[..]), 16);
        assert!(matches!(buf.seek(SeekFrom::Start(0)), Err(ScanError::Unseekable)));
    }

    #[test]
    fn seek_resets_cursor_and_eof() {
        let mut buf = ScanBuffer::new(Cursor::new(b"hello world".to_vec()), 64);
        buf.fill().unwrap();
        buf.set_cursor(buf.end());
        assert_eq!(buf.fill().unwrap(), 0);
        assert_eq!(buf.seek(SeekFrom::Start(6)).unwrap(), 6);
        assert!(!buf.is_eof());
        buf.fill().unwrap();
        assert_eq!(buf.unread(), b"world");
        assert_eq!(buf.tell(), 6);
    }

    #[test]
    fn seek_current_is_relative_to_tell() {
        let mut buf = ScanBuffer::new(Cursor::new(b"0123456789".to_vec()), 64);
        buf.fill().unwrap();
        buf.set_cursor(2);
        assert_eq!(buf.seek(SeekFrom::Current(3)).unwrap(), 5);
        buf.fill().unwrap();
        assert_eq!(buf.unread(), b"56789");
    }

    #[test]
    fn newline_search_hits_sentinel() {
        let window = b"abc\ndef\n";
        assert_eq!(find_newline(window, 0), 3);
        assert_eq!(find_newline(window, 4), 7);
    }
}
