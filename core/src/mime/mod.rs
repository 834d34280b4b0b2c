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

//! RFC 2045 / RFC 5322 pieces the scanner needs at its boundary: Content-Type decoding and raw header fields.

mod content_type;
mod header;
mod utils;

pub use content_type::{
    parse_content_type, parse_parameter_list, ContentType, ContentTypeDecoder, Parameter,
    Rfc2045Decoder,
};
pub use header::{split_header_line, RawHeader};
pub use utils::{is_field_name_char, is_lwsp, is_token, is_token_char, is_usable_boundary};
