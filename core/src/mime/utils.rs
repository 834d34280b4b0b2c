/*
 * utils.rs
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

//! Character classes used by the scanner (RFC 2045 token, RFC 5322 field name, RFC 2046 boundary).

/// Checks if a character is valid in an RFC 2045 token.
#[inline]
pub fn is_token_char(c: u8) -> bool {
    matches!(c,
        b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' |
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~'
    )
}

/// Checks if the string is a valid RFC 2045 token (1+ token chars).
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// Printable US-ASCII except colon (RFC 5322 ftext).
#[inline]
pub fn is_field_name_char(c: u8) -> bool {
    matches!(c, 33..=57 | 59..=126)
}

/// Linear white space inside a header line.
#[inline]
pub fn is_lwsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// A boundary parameter the scanner can search for: non-empty, no control characters and
/// not ending in a space.
///
/// This is looser than RFC 2046 (bchars, at most 70 octets); generators in the wild exceed
/// both and still delimit parts correctly.
pub fn is_usable_boundary(boundary: &str) -> bool {
    let b = boundary.as_bytes();
    !b.is_empty()
        && b.iter().all(|&c| c >= 0x20 && c != 0x7f)
        && b.last() != Some(&b' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert!("Content-Type".bytes().all(is_field_name_char));
        assert!(!is_field_name_char(b':'));
        assert!(!is_field_name_char(b' '));
        assert!(!is_field_name_char(0x7f));
    }

    #[test]
    fn usable_boundaries() {
        assert!(is_usable_boundary("XYZ"));
        assert!(is_usable_boundary("=_Part_12 34"));
        assert!(!is_usable_boundary(""));
        assert!(!is_usable_boundary("trailing "));
        assert!(!is_usable_boundary("line\r\nbreak"));
        assert!(is_usable_boundary(&"x".repeat(71)));
        assert!(is_usable_boundary(&"=_NextPart_".repeat(20)));
    }
}
