/*
 * content_type.rs
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

//! Content-Type header (RFC 2045): type, subtype and parameters, as consumed by the scanner.

use super::utils::is_token;

/// One `name=value` parameter. Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameters: Vec<Parameter>,
}

impl ContentType {
    pub fn new(
        primary_type: impl Into<String>,
        sub_type: impl Into<String>,
        parameters: Option<Vec<Parameter>>,
    ) -> Self {
        Self {
            primary_type: primary_type.into(),
            sub_type: sub_type.into(),
            parameters: parameters.unwrap_or_default(),
        }
    }

    /// Default for parts without a Content-Type (RFC 2045 section 5.2).
    pub fn text_plain() -> Self {
        Self::new("text", "plain", None)
    }

    /// Default for children of multipart/digest (RFC 2046 section 5.1.5).
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822", None)
    }

    pub fn get_primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn get_sub_type(&self) -> &str {
        &self.sub_type
    }

    pub fn is_primary_type(&self, t: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(t)
    }

    pub fn is_sub_type(&self, t: &str) -> bool {
        self.sub_type.eq_ignore_ascii_case(t)
    }

    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.is_primary_type(primary) && self.is_sub_type(sub)
    }

    /// First parameter with this name.
    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.get_parameter(name).is_some()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The `boundary` parameter, if present.
    pub fn boundary(&self) -> Option<&str> {
        self.get_parameter("boundary")
    }
}

/// Turns a raw Content-Type header value into a [`ContentType`].
///
/// The scanner only needs type, subtype and the boundary parameter; callers with a richer
/// header model can plug their own decoder in with `MimeScanner::set_content_type_decoder`.
pub trait ContentTypeDecoder {
    fn decode(&self, raw: &[u8]) -> Option<ContentType>;
}

/// Decoder built on [`parse_content_type`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Rfc2045Decoder;

impl ContentTypeDecoder for Rfc2045Decoder {
    fn decode(&self, raw: &[u8]) -> Option<ContentType> {
        parse_content_type(&String::from_utf8_lossy(raw))
    }
}

/// Parse Content-Type header value. Folded whitespace and comments are tolerated.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = strip_comments(value);
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (type_part, params_part) = match value.find(';') {
        Some(i) => (value[..i].trim(), value[i + 1..].trim()),
        None => (value, ""),
    };
    let slash = type_part.find('/')?;
    let primary = type_part[..slash].trim();
    let sub = type_part[slash + 1..].trim();
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    let parameters = parse_parameter_list(params_part);
    Some(ContentType::new(primary, sub, parameters))
}

/// Parse semicolon-separated parameter list (name=value; name="value").
pub fn parse_parameter_list(params_part: &str) -> Option<Vec<Parameter>> {
    let params_part = params_part.trim();
    if params_part.is_empty() {
        return None;
    }
    let mut parameters = Vec::new();
    let mut pos = 0;
    let bytes = params_part.as_bytes();
    let len = bytes.len();

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let eq = match bytes[pos..].iter().position(|&b| b == b'=') {
            Some(i) => pos + i,
            None => break,
        };
        let name = params_part[pos..eq].trim();
        if !is_token(name) {
            match bytes[pos..].iter().position(|&b| b == b';') {
                Some(semi) => {
                    pos += semi + 1;
                    continue;
                }
                None => break,
            }
        }
        pos = eq + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                let c = bytes[pos];
                if c == b'\\' && pos + 1 < len {
                    v.push(bytes[pos + 1]);
                    pos += 2;
                } else if c == b'"' {
                    pos += 1;
                    break;
                } else {
                    v.push(c);
                    pos += 1;
                }
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b';')
                .map(|i| pos + i)
                .unwrap_or(len);
            let v = params_part[pos..end].trim();
            pos = end;
            // Lenient: unquoted values with tspecials (boundary=----=_Part_1) are common.
            if v.is_empty() || v.bytes().any(|b| b.is_ascii_whitespace()) {
                continue;
            }
            v.to_string()
        };
        parameters.push(Parameter::new(name, value));
    }
    if parameters.is_empty() {
        None
    } else {
        Some(parameters)
    }
}

/// Remove RFC 5322 comments outside quoted strings.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0u32;
    let mut quoted = false;
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            if depth == 0 {
                out.push(c);
            }
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted || depth > 0 => {
                escaped = true;
                if depth == 0 {
                    out.push(c);
                }
            }
            '"' if depth == 0 => {
                quoted = !quoted;
                out.push(c);
            }
            '(' if !quoted => depth += 1,
            ')' if !quoted && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_with_quoted_boundary() {
        let ct = parse_content_type("multipart/mixed; boundary=\"XYZ\"").unwrap();
        assert!(ct.is_mime_type("multipart", "mixed"));
        assert_eq!(ct.boundary(), Some("XYZ"));
    }

    #[test]
    fn folded_parameters() {
        let ct = parse_content_type("Multipart/Alternative;\r\n\tboundary=----=_Part_7;\n charset=us-ascii")
            .unwrap();
        assert!(ct.is_primary_type("multipart"));
        assert_eq!(ct.get_sub_type(), "Alternative");
        assert_eq!(ct.get_parameter("BOUNDARY"), Some("----=_Part_7"));
        assert_eq!(ct.get_parameter("charset"), Some("us-ascii"));
    }

    #[test]
    fn comments_are_ignored() {
        let ct = parse_content_type("text/plain (body text); charset=\"utf-8 (not a comment)\"").unwrap();
        assert!(ct.is_mime_type("text", "plain"));
        assert_eq!(ct.get_parameter("charset"), Some("utf-8 (not a comment)"));
    }

    #[test]
    fn rejects_missing_subtype() {
        assert!(parse_content_type("text").is_none());
        assert!(parse_content_type("").is_none());
        assert!(parse_content_type("text/").is_none());
    }

    #[test]
    fn decoder_is_lossy_on_raw_bytes() {
        let ct = Rfc2045Decoder.decode(b"text/plain; name=\"caf\xe9\"").unwrap();
        assert!(ct.is_mime_type("text", "plain"));
        assert!(ct.has_parameter("name"));
    }
}
