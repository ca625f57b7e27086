//! RFC 822 header block inspection
//!
//! A header block is represented as a single string of `\n`-joined lines,
//! where a line starting with a space or tab is a continuation of the
//! previous field. This mirrors the layout the archive hands back for an
//! item's raw transport headers.

use crate::sanitize::stristr;

const KNOWN_REASONABLE: &[&str] = &[
    "Content-Language: ",
    "Content-Type: ",
    "DKIM-Signature: ",
    "Date: ",
    "Delivered-To: ",
    "From: ",
    "MIME-Version: ",
    "Microsoft Mail Internet Headers",
    "Received: ",
    "Return-Path: ",
    "Subject: ",
    "To: ",
    "User-Agent: ",
    "X-ASG-Debug-ID: ",
    "X-Barracuda-URL: ",
    "X-x: ",
];

/// Case-insensitive match of `field` against the start of `header`, or
/// anywhere within it when `field` doesn't open the block
fn header_match(header: &str, field: &str) -> bool {
    has_field(header, field)
}

/// True if a header block looks enough like real RFC 822 headers to keep
///
/// Accepts blocks that open with (or contain, for the single-line case) one
/// of a known set of field names commonly seen in real PST archives.
pub fn valid_headers(header: &str) -> bool {
    if header.trim().is_empty() {
        return false;
    }
    KNOWN_REASONABLE.iter().any(|field| header_match(header, field)) || header_is_reasonable(header)
}

/// A loose structural check: an upper-case-led field name made of
/// `[A-Za-z0-9-]`, a colon, then a printable US-ASCII value terminated by
/// CRLF (optionally folded onto a continuation line).
fn header_is_reasonable(header: &str) -> bool {
    let bytes = header.as_bytes();
    let mut i = 0;
    if bytes.is_empty() || !bytes[0].is_ascii_uppercase() {
        return false;
    }
    i += 1;
    loop {
        match bytes.get(i) {
            Some(b) if b.is_ascii_alphanumeric() || *b == b'-' => i += 1,
            Some(b':') => {
                i += 1;
                break;
            }
            _ => return false,
        }
    }
    loop {
        match bytes.get(i) {
            Some(&b) if (33..=126).contains(&b) || b == b' ' || b == b'\t' => i += 1,
            Some(b'\r') if bytes.get(i + 1) == Some(&b'\n') => {
                i += 2;
                match bytes.get(i) {
                    Some(b' ') | Some(b'\t') => i += 1,
                    _ => return true,
                }
            }
            None => return true,
            _ => return false,
        }
    }
}

/// True if `field` (e.g. `"\nSubject: "`) is present in `header`, either as a
/// substring or as the literal opening of the block (matching a field at the
/// very start, where the leading `\n` of `field` would not appear).
pub fn has_field(header: &str, field: &str) -> bool {
    if stristr(header, field).is_some() {
        return true;
    }
    let without_leading = &field[1..];
    header.len() >= without_leading.len()
        && header[..without_leading.len()].eq_ignore_ascii_case(without_leading)
}

/// Byte offset in `header` where `field` starts, honoring the same
/// start-of-block special case as [`has_field`]
pub fn get_field<'h>(header: &'h str, field: &str) -> Option<&'h str> {
    if let Some(found) = stristr(header, field) {
        return Some(found);
    }
    let without_leading = &field[1..];
    if header.len() >= without_leading.len() && header[..without_leading.len()].eq_ignore_ascii_case(without_leading) {
        return Some(header);
    }
    None
}

/// Offset of the `\n` ending the field that starts at `field`, skipping
/// folded continuation lines. Returns `None` if the field runs to the end
/// of the block.
pub fn end_of_field(field: &str) -> Option<usize> {
    let bytes = field.as_bytes();
    let mut search_from = 1;
    loop {
        let newline = bytes[search_from..].iter().position(|&b| b == b'\n')? + search_from;
        match bytes.get(newline + 1) {
            Some(b' ') | Some(b'\t') => {
                search_from = newline + 1;
            }
            _ => return Some(newline),
        }
    }
}

/// Extract `subfield="value"` or `subfield=value` from a single header field
/// value, e.g. `boundary=` out of a `Content-Type:` line.
pub fn get_subfield(field: &str, subfield: &str) -> Option<String> {
    let search = format!(" {subfield}=");
    let body = &field[1.min(field.len())..];
    let end = end_of_field(field).map(|e| e).unwrap_or(field.len());
    let found = stristr(body, &search)?;
    let found_offset = field.len() - found.len();
    if found_offset >= end {
        return None;
    }
    let value_start = found_offset + search.len();
    let rest = &field[value_start..];
    if rest.starts_with('"') {
        let rest = &rest[1..];
        let close = rest.find('"').unwrap_or(rest.len());
        Some(rest[..close].to_string())
    } else {
        let semi = rest.find(';');
        let newline = rest.find('\n');
        let limit = match (semi, newline) {
            (Some(s), Some(n)) => s.min(n),
            (Some(s), None) => s,
            (None, Some(n)) => n,
            (None, None) => rest.len(),
        };
        let limit = limit.min(end.saturating_sub(value_start));
        Some(rest[..limit].to_string())
    }
}

/// Remove every occurrence of a header field from the block, returning a new string
///
/// Unlike the in-place original this never mutates `header`; callers thread
/// the returned value forward.
pub fn strip_field(header: &str, field: &str) -> String {
    let mut result = header.to_string();
    while let Some(start_rel) = get_field(&result, field).map(|f| result.len() - f.len()) {
        let field_slice = &result[start_rel..];
        match end_of_field(field_slice) {
            Some(end_rel) => {
                let mut cut_start = start_rel;
                let mut cut_end = start_rel + end_rel;
                if start_rel == 0 {
                    cut_end += 1; // also drop the \n terminating this field
                } else {
                    cut_start += 0;
                }
                result.replace_range(cut_start..cut_end, "");
            }
            None => {
                result.truncate(start_rel);
                break;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_headers_rejects_empty() {
        assert!(!valid_headers(""));
    }

    #[test]
    fn valid_headers_accepts_known_field_at_start() {
        assert!(valid_headers("Subject: hello\nFrom: a@b.com\n"));
    }

    #[test]
    fn valid_headers_rejects_body_fragment() {
        assert!(!valid_headers("just some text with no header shape at all"));
    }

    #[test]
    fn has_field_matches_mid_block() {
        let header = "Subject: hi\nContent-Type: text/plain\n";
        assert!(has_field(header, "\nContent-Type: "));
    }

    #[test]
    fn has_field_matches_start_of_block() {
        let header = "Content-Type: text/plain\n";
        assert!(has_field(header, "\nContent-Type: "));
    }

    #[test]
    fn end_of_field_skips_folded_continuation() {
        let field = "\nReceived: from a\n by b\n by c\nSubject: x\n";
        let end = end_of_field(field).unwrap();
        assert_eq!(&field[..end], "\nReceived: from a\n by b\n by c");
    }

    #[test]
    fn get_subfield_extracts_quoted_boundary() {
        let field = "\nContent-Type: multipart/mixed; boundary=\"abc123\"\n";
        assert_eq!(get_subfield(field, "boundary"), Some("abc123".to_string()));
    }

    #[test]
    fn get_subfield_extracts_unquoted_value_terminated_by_semicolon() {
        let field = "\nContent-Type: text/plain; charset=utf-8; format=flowed\n";
        assert_eq!(get_subfield(field, "charset"), Some("utf-8".to_string()));
    }

    #[test]
    fn strip_field_removes_matching_field_only() {
        let header = "Subject: hi\nContent-Type: text/plain\nFrom: a@b.com\n";
        let stripped = strip_field(header, "\nContent-Type: ");
        assert!(!stripped.contains("Content-Type"));
        assert!(stripped.contains("Subject: hi"));
        assert!(stripped.contains("From: a@b.com"));
    }

    #[test]
    fn strip_field_removes_multiple_occurrences() {
        let header = "Received: one\nReceived: two\nSubject: hi\n";
        let stripped = strip_field(header, "\nReceived: ");
        assert!(!stripped.contains("Received"));
        assert!(stripped.contains("Subject: hi"));
    }
}
