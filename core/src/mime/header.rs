/*
 * header.rs
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

//! Raw header fields as the scanner stores them: undecoded value octets, folding kept.

use super::utils::{is_field_name_char, is_lwsp};

/// A header field borrowed from the scanner's current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader<'a> {
    name: &'a str,
    value: &'a [u8],
    offset: u64,
}

impl<'a> RawHeader<'a> {
    pub(crate) fn new(name: &'a str, value: &'a [u8], offset: u64) -> Self {
        Self { name, value, offset }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Value after the colon, leading white space removed, continuation lines kept verbatim.
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Absolute offset of the first byte of the header line in the source.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Split one unfolded-or-folded header line (no trailing line break) into name and value.
///
/// White space between the field name and the colon is accepted (RFC 5322 obs-optional).
/// Returns None for lines without a colon or with an invalid field name.
pub fn split_header_line(line: &[u8]) -> Option<(&str, &[u8])> {
    let colon = line.iter().position(|&b| b == b':')?;
    let mut name_end = colon;
    while name_end > 0 && is_lwsp(line[name_end - 1]) {
        name_end -= 1;
    }
    let name = &line[..name_end];
    if name.is_empty() || !name.iter().copied().all(is_field_name_char) {
        return None;
    }
    let mut value = &line[colon + 1..];
    while let Some((&first, rest)) = value.split_first() {
        if !is_lwsp(first) {
            break;
        }
        value = rest;
    }
    // All field-name chars are ASCII.
    let name = std::str::from_utf8(name).ok()?;
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_field() {
        let (name, value) = split_header_line(b"Subject:  hello world").unwrap();
        assert_eq!(name, "Subject");
        assert_eq!(value, b"hello world");
    }

    #[test]
    fn folded_value_is_kept() {
        let (name, value) = split_header_line(b"To: a@b,\r\n c@d").unwrap();
        assert_eq!(name, "To");
        assert_eq!(value, b"a@b,\r\n c@d");
    }

    #[test]
    fn obsolete_space_before_colon() {
        let (name, value) = split_header_line(b"Subject : s").unwrap();
        assert_eq!(name, "Subject");
        assert_eq!(value, b"s");
    }

    #[test]
    fn invalid_lines() {
        assert!(split_header_line(b"no colon here").is_none());
        assert!(split_header_line(b": empty name").is_none());
        assert!(split_header_line(b"bad name: x").is_none());
    }

    #[test]
    fn empty_value() {
        let (name, value) = split_header_line(b"X-Empty:").unwrap();
        assert_eq!(name, "X-Empty");
        assert!(value.is_empty());
    }
}
