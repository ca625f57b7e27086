//! Text encoding helpers: RFC 2047/2425/2426/2445 formatting, charset
//! transcoding, and base64.
//!
//! These wrap `encoding_rs`/`base64`/`chrono` rather than hand-rolling the
//! underlying codecs; only the formatting rules specific to this tool's
//! output formats are original here.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};

use crate::model::FileTime;

/// Ticks (100ns units) between the Windows epoch (1601-01-01) and the Unix epoch
const FILETIME_TO_UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// Convert a PST `FILETIME` into a UTC `DateTime`, or `None` if the value is
/// out of chrono's representable range
pub fn filetime_to_datetime(ft: FileTime) -> Option<DateTime<Utc>> {
    let ticks = ft.0 as i64 - FILETIME_TO_UNIX_EPOCH_TICKS;
    let secs = ticks.div_euclid(10_000_000);
    let nanos = (ticks.rem_euclid(10_000_000)) * 100;
    Utc.timestamp_opt(secs, nanos as u32).single()
}

/// `Thu Jan  1 00:00:00 1970` style ctime-like rendering, with that exact
/// string as the fallback for an unrepresentable or absent timestamp
pub fn ctime_like(dt: Option<DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => dt.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => "Thu Jan  1 00:00:00 1970".to_string(),
    }
}

/// RFC 5322 `Date:` header value: `Tue, 01 Jan 2030 00:00:00 +0000`, always
/// rendered in GMT/UTC
pub fn rfc5322_date(dt: Option<DateTime<Utc>>) -> String {
    let dt = dt.unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap());
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// RFC 2425 vCard datetime: `yyyy-mm-ddThh:mm:ssZ`
pub fn rfc2425_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// RFC 5545 iCalendar datetime: `yyyymmddThhmmssZ`
pub fn rfc2445_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// iCalendar datetime for "now", given an already-resolved current time
/// (callers supply this since the crate avoids reading the clock internally
/// outside of `main`)
pub fn rfc2445_datetime_now(now: DateTime<Utc>) -> String {
    rfc2445_datetime(now)
}

/// Encode a header value as an RFC 2047 encoded-word if it contains any
/// non-ASCII bytes; returns the input unchanged otherwise
pub fn rfc2047_encode(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
    format!("=?utf-8?B?{encoded}?=")
}

/// Escape a vCard/iCalendar text value per RFC 2426 §5.8.4 / RFC 5545 §3.3.11:
/// backslash, comma, semicolon are backslash-escaped; newlines become `\n`
pub fn rfc2426_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | ',' | ';' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Strip `\r` from a string, converting `\r\n` line endings to bare `\n`
pub fn remove_cr(input: &str) -> String {
    input.chars().filter(|&c| c != '\r').collect()
}

/// Case-insensitive ASCII string equality
pub fn stricmp(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Heuristic used to decide whether a text body needs base64 transport
/// encoding: any byte below 0x20 other than tab/newline
pub fn needs_base64(bytes: &[u8]) -> bool {
    bytes.iter().any(|&b| b < 0x20 && b != b'\t' && b != b'\n')
}

pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Re-encode a UTF-8 string into the named charset, returning `None` if the
/// charset is unknown or the string contains characters unrepresentable in it
pub fn transcode_from_utf8(text: &str, charset: &str) -> Option<Vec<u8>> {
    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes())?;
    let (bytes, _, had_unmappable) = encoding.encode(text);
    if had_unmappable {
        None
    } else {
        Some(bytes.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetime_to_datetime_epoch_offset() {
        let dt = filetime_to_datetime(FileTime(FILETIME_TO_UNIX_EPOCH_TICKS as u64)).unwrap();
        assert_eq!(dt.timestamp(), 0);
    }

    #[test]
    fn ctime_like_fallback_for_none() {
        assert_eq!(ctime_like(None), "Thu Jan  1 00:00:00 1970");
    }

    #[test]
    fn rfc5322_date_uses_gmt_offset() {
        let dt = Utc.timestamp_opt(0, 0).single().unwrap();
        assert_eq!(rfc5322_date(Some(dt)), "Thu, 01 Jan 1970 00:00:00 +0000");
    }

    #[test]
    fn rfc2047_encode_passes_through_ascii() {
        assert_eq!(rfc2047_encode("plain subject"), "plain subject");
    }

    #[test]
    fn rfc2047_encode_wraps_non_ascii_in_base64_word() {
        let encoded = rfc2047_encode("café");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn rfc2426_escape_escapes_reserved_chars() {
        assert_eq!(rfc2426_escape("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn remove_cr_strips_carriage_returns() {
        assert_eq!(remove_cr("a\r\nb\rc"), "a\nbc");
    }

    #[test]
    fn needs_base64_detects_control_bytes() {
        assert!(needs_base64(b"hello\x00world"));
        assert!(!needs_base64(b"hello\tworld\n"));
    }

    #[test]
    fn rfc2445_datetime_format() {
        let dt = Utc.timestamp_opt(0, 0).single().unwrap();
        assert_eq!(rfc2445_datetime(dt), "19700101T000000Z");
    }
}
