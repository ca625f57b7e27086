//! Filename and header-value sanitizers
//!
//! Pure string transforms used when turning archive content into filesystem
//! paths and quoted header parameters.

use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// Replace path separators with `_` so an archive-derived name is safe to use
/// as a single path component
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

/// Case-insensitive check that `ext` (without a leading dot) is present in
/// `allowed`. An empty or absent allow-list accepts everything.
pub fn extension_acceptable(ext: Option<&str>, allowed: Option<&std::collections::HashSet<String>>) -> bool {
    match allowed {
        None => true,
        Some(set) if set.is_empty() => true,
        Some(set) => match ext {
            None => true,
            Some(e) => set.contains(&e.to_ascii_lowercase()),
        },
    }
}

/// Find a filesystem path that does not yet exist, starting from `base` and
/// appending a zero-padded 8-digit counter directly after the full filename
/// (including its extension) until one is free, e.g. `Inbox.mbox00000001`.
///
/// When `overwrite` is set the base path is returned unconditionally.
pub fn unique_output_path(base: &Path, overwrite: bool) -> AppResult<PathBuf> {
    if overwrite || !base.exists() {
        return Ok(base.to_path_buf());
    }

    let full_name = base.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let parent = base.parent().unwrap_or_else(|| Path::new(""));

    for n in 1..=99_999_999u32 {
        let candidate = parent.join(format!("{full_name}{n:08}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(AppError::SuffixExhausted(base.display().to_string()))
}

/// Backslash-escape `"` and `\` in a string, for use inside a quoted MIME parameter
pub fn backslash_quote(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// RFC 5987 `attr-char`: unreserved characters that need no percent-encoding
fn is_attribute_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
}

/// Encode a string as an RFC 2231 extended parameter value: `utf-8''<percent-encoded>`
pub fn rfc2231_encode(input: &str) -> String {
    let mut out = String::from("utf-8''");
    for &b in input.as_bytes() {
        if is_attribute_char(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02x}"));
        }
    }
    out
}

/// Case-insensitive substring search, used for matching header field names
/// and `<meta charset>` sniffing
pub fn stristr<'h>(haystack: &'h str, needle: &str) -> Option<&'h str> {
    if needle.is_empty() {
        return Some(haystack);
    }
    let hay_lower = haystack.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    hay_lower.find(&needle_lower).map(|idx| &haystack[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sanitize_filename_replaces_separators() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("plain"), "plain");
    }

    #[test]
    fn extension_acceptable_with_no_list_accepts_all() {
        assert!(extension_acceptable(Some("exe"), None));
        assert!(extension_acceptable(None, None));
    }

    #[test]
    fn extension_acceptable_checks_membership_case_insensitively() {
        let mut set = HashSet::new();
        set.insert("pdf".to_string());
        assert!(extension_acceptable(Some("PDF"), Some(&set)));
        assert!(!extension_acceptable(Some("exe"), Some(&set)));
        // no extension is always acceptable, matching acceptable_ext's behavior
        assert!(extension_acceptable(None, Some(&set)));
    }

    #[test]
    fn unique_output_path_returns_base_when_free() {
        let dir = std::env::temp_dir().join(format!("pst-extract-test-{}", std::process::id()));
        let base = dir.join("does-not-exist.eml");
        let result = unique_output_path(&base, false).unwrap();
        assert_eq!(result, base);
    }

    #[test]
    fn unique_output_path_overwrite_always_returns_base() {
        let base = Path::new("/dev/null");
        let result = unique_output_path(base, true).unwrap();
        assert_eq!(result, base);
    }

    #[test]
    fn unique_output_path_bumps_with_zero_padded_suffix_on_collision() {
        let dir = std::env::temp_dir().join(format!("pst-extract-test-collide-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("Inbox.mbox");
        std::fs::write(&base, "existing").unwrap();

        let result = unique_output_path(&base, false).unwrap();
        assert_eq!(result, dir.join("Inbox.mbox00000001"));

        std::fs::write(&result, "also existing").unwrap();
        let result2 = unique_output_path(&base, false).unwrap();
        assert_eq!(result2, dir.join("Inbox.mbox00000002"));
    }

    #[test]
    fn backslash_quote_escapes_quotes_and_backslashes() {
        assert_eq!(backslash_quote(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(backslash_quote("plain"), "plain");
    }

    #[test]
    fn rfc2231_encode_percent_encodes_non_attribute_chars() {
        assert_eq!(rfc2231_encode("a b"), "utf-8''a%20b");
        assert_eq!(rfc2231_encode("simple.txt"), "utf-8''simple.txt");
    }

    #[test]
    fn stristr_matches_case_insensitively() {
        assert_eq!(stristr("Content-Type: TEXT/html", "text/html"), Some("TEXT/html"));
        assert_eq!(stristr("abc", "z"), None);
    }
}
