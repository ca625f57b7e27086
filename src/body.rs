//! MIME body-part rendering
//!
//! Renders a single text body (plain, HTML, or a DSN/MDN report body) as one
//! `boundary`-delimited MIME part: CRLF normalization, charset selection and
//! transcoding, and base64 transport encoding when the text contains control
//! bytes that would otherwise corrupt line-oriented transport.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use crate::charset;
use crate::errors::{AppError, AppResult};
use crate::model::PstString;

/// Render one body part into `out`, appended after the preceding part (or
/// the header block) with the blank-line-then-boundary framing the format expects.
///
/// `mboxrd` applies [`mboxrd_quote`] to the written lines; the caller passes
/// `true` only for mbox-family, multi-message output (never in one-message-per-file mode).
pub fn write_body_part(
    out: &mut String,
    body: &PstString,
    mime: &str,
    charset_hint: &str,
    boundary: &str,
    prefer_utf8: bool,
    mboxrd: bool,
) {
    let text = charset::remove_cr(&body.text);

    let (final_charset, final_bytes): (String, Vec<u8>) = if body.is_utf8 && !charset::stricmp(charset_hint, "utf-8") {
        if prefer_utf8 {
            ("utf-8".to_string(), text.into_bytes())
        } else {
            match charset::transcode_from_utf8(&text, charset_hint) {
                Some(bytes) => (charset_hint.to_string(), bytes),
                None => ("utf-8".to_string(), text.into_bytes()),
            }
        }
    } else {
        (charset_hint.to_string(), text.into_bytes())
    };

    let base64 = charset::needs_base64(&final_bytes);

    let _ = write!(out, "\n--{boundary}\n");
    let _ = write!(out, "Content-Type: {mime}; charset=\"{final_charset}\"\n");
    if base64 {
        out.push_str("Content-Transfer-Encoding: base64\n");
    }
    out.push('\n');

    if base64 {
        let mut encoded = String::new();
        write_wrapped_base64(&mut encoded, &charset::base64_encode(&final_bytes));
        if mboxrd {
            encoded = mboxrd_quote(&encoded);
        }
        out.push_str(&encoded);
        out.push('\n');
    } else {
        let mut decoded = String::from_utf8_lossy(&final_bytes).into_owned();
        if mboxrd {
            decoded = mboxrd_quote(&decoded);
        }
        out.push_str(&decoded);
    }
}

/// Write base64 text wrapped at 76 columns, the conventional MIME line length
fn write_wrapped_base64(out: &mut String, encoded: &str) {
    for chunk in encoded.as_bytes().chunks(76) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 alphabet is ascii"));
        out.push('\n');
    }
}

/// Apply mboxrd `>`-quoting: any line that begins with zero or more `>`
/// followed by `From ` gets one more `>` prepended, so mbox readers never
/// mistake a body line for a message separator.
pub fn mboxrd_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let unquoted = line.trim_end_matches('\n');
        let mut rest = unquoted;
        while let Some(stripped) = rest.strip_prefix('>') {
            rest = stripped;
        }
        if rest.starts_with("From ") {
            out.push('>');
        }
        out.push_str(unquoted);
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Pattern for a `<meta content="...charset=xxx...">` declaration, compiled
/// once at startup via [`compile_charset_regex`] and reused by every call to
/// [`find_html_charset`].
const CHARSET_PATTERN: &str = r#"(?i)<meta[^>]*content="[^>]*charset=([^>";]*)[";]"#;

static CHARSET_RE: OnceLock<Regex> = OnceLock::new();

/// Compile the HTML meta-charset pattern once, at startup, so a malformed
/// pattern is reported before any archive work begins rather than on first use.
pub fn compile_charset_regex() -> AppResult<()> {
    let re = Regex::new(CHARSET_PATTERN).map_err(|e| AppError::RegexCompile(e.to_string()))?;
    let _ = CHARSET_RE.set(re);
    Ok(())
}

/// Find the first `<meta charset="...">`/`<meta ... charset=...>`-style
/// declaration in an HTML body, case-insensitively.
///
/// Falls back to compiling the pattern on first use if [`compile_charset_regex`]
/// was never called (e.g. in tests), since the pattern is a fixed literal that
/// cannot fail to compile.
pub fn find_html_charset(html: &str) -> Option<String> {
    let re = CHARSET_RE.get_or_init(|| Regex::new(CHARSET_PATTERN).expect("fixed charset pattern"));
    let caps = re.captures(html)?;
    Some(caps.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mboxrd_quote_adds_one_gt_per_from_line() {
        let input = "From me\n>From already quoted\nplain line\n";
        let quoted = mboxrd_quote(input);
        assert_eq!(quoted, ">From me\n>>From already quoted\nplain line\n");
    }

    #[test]
    fn mboxrd_quote_ignores_lines_not_starting_with_from() {
        let input = "Subject: From me to you\n";
        assert_eq!(mboxrd_quote(input), input);
    }

    #[test]
    fn find_html_charset_extracts_quoted_value() {
        let html = r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=iso-8859-1"></head></html>"#;
        assert_eq!(find_html_charset(html), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn find_html_charset_returns_none_when_absent() {
        assert_eq!(find_html_charset("<html><body>hi</body></html>"), None);
    }

    #[test]
    fn write_body_part_marks_base64_for_control_bytes() {
        let mut out = String::new();
        let body = PstString::narrow("hello\x00world");
        write_body_part(&mut out, &body, "text/plain", "us-ascii", "B", false, false);
        assert!(out.contains("Content-Transfer-Encoding: base64"));
    }

    #[test]
    fn write_body_part_plain_text_not_base64() {
        let mut out = String::new();
        let body = PstString::narrow("hello world");
        write_body_part(&mut out, &body, "text/plain", "us-ascii", "B", false, false);
        assert!(!out.contains("base64"));
        assert!(out.contains("hello world"));
    }

    #[test]
    fn write_body_part_quotes_from_lines_when_mboxrd_enabled() {
        let mut out = String::new();
        let body = PstString::narrow("From the desk of someone\nplain line\n");
        write_body_part(&mut out, &body, "text/plain", "us-ascii", "B", false, true);
        assert!(out.contains(">From the desk of someone\n"));
    }

    #[test]
    fn write_body_part_leaves_from_lines_unquoted_outside_mboxrd() {
        let mut out = String::new();
        let body = PstString::narrow("From the desk of someone\n");
        write_body_part(&mut out, &body, "text/plain", "us-ascii", "B", false, false);
        assert!(out.contains("\nFrom the desk of someone\n"));
        assert!(!out.contains(">From"));
    }
}
