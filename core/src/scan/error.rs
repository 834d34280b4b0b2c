/*
 * error.rs
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

//! Scanner errors.

use std::io;

use thiserror::Error;

/// Errors from [`MimeScanner`](super::MimeScanner) operations.
///
/// Malformed message structure is never an error; the scanner degrades instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The source failed while the scanner was reading. End of data was not assumed.
    #[error("read from message source failed: {0}")]
    Io(#[from] io::Error),
    /// A previous read failed; seek or re-initialise before stepping again.
    #[error("scanner halted after source error ({0:?})")]
    Halted(io::ErrorKind),
    /// `seek` on a source that cannot reposition.
    #[error("message source is not seekable")]
    Unseekable,
}

impl ScanError {
    /// The I/O error kind behind this error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            ScanError::Io(e) => Some(e.kind()),
            ScanError::Halted(kind) => Some(*kind),
            ScanError::Unseekable => None,
        }
    }
}
