/*
 * state.rs
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

//! Scanner states as reported by `step()`.

use std::fmt;

/// One reported transition of the scanner.
///
/// The `*End` variants close the construct opened by their counterpart; `Eof` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    Initial,
    /// Content before the first "From " line (reported only with `scan_pre_from`).
    PreFrom,
    /// A "From " separator line was found; `from_line()` holds it.
    From,
    /// Headers of a leaf part are available; the body follows.
    Header,
    /// A chunk of body content is available.
    Body,
    /// Headers of a multipart container are available.
    Multipart,
    /// Headers of a message/rfc822 part are available; the embedded message follows.
    Message,
    FromEnd,
    BodyEnd,
    MultipartEnd,
    MessageEnd,
    Eof,
}

impl ScanState {
    pub fn is_end(self) -> bool {
        matches!(
            self,
            ScanState::FromEnd
                | ScanState::BodyEnd
                | ScanState::MultipartEnd
                | ScanState::MessageEnd
                | ScanState::Eof
        )
    }

    /// The state with its end flag stripped: `FromEnd` to `From`, `Eof` to `Initial`.
    pub fn opening(self) -> ScanState {
        match self {
            ScanState::FromEnd => ScanState::From,
            ScanState::BodyEnd => ScanState::Body,
            ScanState::MultipartEnd => ScanState::Multipart,
            ScanState::MessageEnd => ScanState::Message,
            ScanState::Eof => ScanState::Initial,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanState::Initial => "INITIAL",
            ScanState::PreFrom => "PRE_FROM",
            ScanState::From => "FROM",
            ScanState::Header => "HEADER",
            ScanState::Body => "BODY",
            ScanState::Multipart => "MULTIPART",
            ScanState::Message => "MESSAGE",
            ScanState::FromEnd => "FROM_END",
            ScanState::BodyEnd => "BODY_END",
            ScanState::MultipartEnd => "MULTIPART_END",
            ScanState::MessageEnd => "MESSAGE_END",
            ScanState::Eof => "EOF",
        }
    }
}

impl Default for ScanState {
    fn default() -> Self {
        ScanState::Initial
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_flag_strips_to_opening_state() {
        assert_eq!(ScanState::FromEnd.opening(), ScanState::From);
        assert_eq!(ScanState::MessageEnd.opening(), ScanState::Message);
        assert_eq!(ScanState::Eof.opening(), ScanState::Initial);
        assert_eq!(ScanState::Multipart.opening(), ScanState::Multipart);
    }

    #[test]
    fn end_states() {
        assert!(ScanState::Eof.is_end());
        assert!(ScanState::BodyEnd.is_end());
        assert!(!ScanState::Body.is_end());
        assert!(!ScanState::Initial.is_end());
    }
}
