//! RFC 822/MIME mail serialization
//!
//! Turns a parsed email [`Item`] into an mboxrd-framed (or headers-only, for
//! separate/MH layout) MIME message: a `From ` separator line, a header
//! block assembled from the archive's own headers plus any fields it lacks,
//! and a multipart body carrying the plain/HTML text, inline attachments,
//! embedded messages, and a schedule part for PST_TYPE_SCHEDULE items.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::archive::RtfDecompressor;
use crate::body;
use crate::charset;
use crate::headers;
use crate::model::{Attachment, AttachMethod, EmailFields, Item, ItemKind};
use crate::sanitize;

/// Whether the separator line preceding a message should be framed as an
/// mbox `From ` line, or omitted entirely (MH-style separate files)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Mbox,
    Headers,
}

#[derive(Clone, Copy)]
pub struct RenderOptions<'a> {
    pub framing: Framing,
    pub save_rtf_body: bool,
    pub prefer_utf8: bool,
    pub default_charset: &'a str,
    /// True when this call is rendering an attachment embedded inside another message
    pub embedding: bool,
    /// `-a` filter: extensions to keep a by-value/by-reference attachment for; `None` keeps all
    pub acceptable_extensions: Option<&'a std::collections::HashSet<String>>,
    /// True in Separate layout (one output file per item), regardless of the
    /// MH submode; gates mboxrd body quoting and whether attachments are
    /// inlined or written as sibling files.
    pub one_message_per_file: bool,
}

/// Render one email item to a complete message. Returns the rendered text,
/// the RFC 822 header block found inside this message's body as a side
/// channel (used by the caller to seed `extra_mime_headers` for any embedded
/// `message/rfc822` attachments it contains), and any attachments that must
/// be written as sibling files rather than inlined (one-message-per-file
/// mode with the MH flag off), paired with their desired filename.
pub fn render_mail(
    item: &Item,
    opts: &RenderOptions,
    extra_mime_headers: Option<&str>,
    resolve_embedded: Option<&dyn Fn(u64) -> Option<Item>>,
    rtf_decompressor: &dyn RtfDecompressor,
) -> (String, Option<String>, Vec<(String, Vec<u8>)>) {
    let email = item.email.clone().unwrap_or_default();
    let mut out = String::new();

    let raw_headers = email.header.as_deref().unwrap_or("");
    let headers_block = if headers::valid_headers(raw_headers) {
        Some(charset::remove_cr(raw_headers))
    } else {
        extra_mime_headers.filter(|h| headers::valid_headers(h)).map(|h| charset::remove_cr(h))
    };

    let mut extracted_mime_headers = None;
    let header_text = headers_block.as_deref().map(|full| {
        if let Some(split) = full.find("\n\n") {
            extracted_mime_headers = Some(full[split + 2..].to_string());
            full[..split + 1].to_string()
        } else {
            full.to_string()
        }
    });

    let has_from = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nFrom:"));
    let has_to = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nTo:"));
    let has_subject = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nSubject:"));
    let has_date = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nDate:"));
    let has_cc = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nCC:"));
    let has_msgid = header_text.as_deref().is_some_and(|h| headers::has_field(h, "\nMessage-Id:"));

    let mut body_charset = opts.default_charset.to_string();
    let mut body_report = "delivery-status".to_string();
    if let Some(h) = header_text.as_deref() {
        if let Some(ct) = headers::get_field(h, "\nContent-Type:") {
            if let Some(cs) = headers::get_subfield(ct, "charset") {
                body_charset = cs;
            }
            if let Some(rt) = headers::get_subfield(ct, "report-type") {
                body_report = rt;
            }
        }
    }

    let sender_address = email.sender_address.clone();
    let sender_known = sender_address.as_deref().is_some_and(|a| a.contains('@'));
    let mut sender = sender_address.clone().unwrap_or_else(|| "MAILER-DAEMON".to_string());
    if !sender_known {
        if let Some(h) = header_text.as_deref() {
            if let Some(from_field) = headers::get_field(h, "\nFrom:") {
                if let Some(line_end) = from_field[1..].find('\n') {
                    let line = &from_field[1..1 + line_end];
                    if let (Some(s), Some(e)) = (line.find('<'), line.find('>')) {
                        if s < e {
                            sender = line[s + 1..e].to_string();
                        }
                    }
                }
            }
        }
    }

    let sent_datetime = email.sent_date.and_then(charset::filetime_to_datetime);
    let ctime_line = charset::ctime_like(sent_datetime);

    let boundary = format!("boundary-LibPST-iamunique-{}_-_-", item.block_id);
    let altboundary = format!("alt-{boundary}");

    if opts.framing == Framing::Mbox {
        let quo = if opts.embedding { ">" } else { "" };
        let _ = write!(out, "{quo}From \"{sender}\" {ctime_line}\n");
    }

    let mut stripped_headers = header_text.unwrap_or_default();
    for field in [
        "\nMicrosoft Mail Internet Headers",
        "\nMIME-Version:",
        "\nContent-Type:",
        "\nContent-Transfer-Encoding:",
        "\nContent-class:",
        "\nX-MimeOLE:",
        "\nX-From_:",
    ] {
        stripped_headers = headers::strip_field(&stripped_headers, field);
    }
    if !stripped_headers.is_empty() {
        out.push_str(&stripped_headers);
        if !stripped_headers.ends_with('\n') {
            out.push('\n');
        }
    }

    if email.is_read {
        out.push_str("Status: RO\n");
    }

    if !has_from {
        match &email.outlook_sender_name {
            Some(name) => {
                let _ = write!(out, "From: {} <{sender}>\n", charset::rfc2047_encode(name));
            }
            None => {
                let _ = write!(out, "From: <{sender}>\n");
            }
        }
    }

    if !has_subject {
        match &item.subject {
            Some(subject) => {
                let _ = write!(out, "Subject: {}\n", charset::rfc2047_encode(&subject.text));
            }
            None => out.push_str("Subject: \n"),
        }
    }

    if !has_to {
        if let Some(to) = &email.sentto_address {
            let _ = write!(out, "To: {}\n", charset::rfc2047_encode(to));
        }
    }

    if !has_cc {
        if let Some(cc) = &email.cc_address {
            let _ = write!(out, "Cc: {}\n", charset::rfc2047_encode(cc));
        }
    }

    if !has_date {
        if email.sent_date.is_some() {
            let _ = write!(out, "Date: {}\n", charset::rfc5322_date(sent_datetime));
        }
    }

    if !has_msgid {
        if let Some(id) = &email.messageid {
            let _ = write!(out, "Message-Id: {id}\n");
        }
    }

    if let Some(addr) = &sender_address {
        if !addr.contains('@') && addr != "." && !addr.is_empty() {
            let _ = write!(out, "X-libpst-forensic-sender: {addr}\n");
        }
    }
    if let Some(bcc) = &email.bcc_address {
        let _ = write!(out, "X-libpst-forensic-bcc: {bcc}\n");
    }

    out.push_str("MIME-Version: 1.0\n");
    if item.kind == ItemKind::Report {
        let _ = write!(out, "Content-Type: multipart/report; report-type={body_report};\n\tboundary=\"{boundary}\"\n");
    } else {
        let _ = write!(out, "Content-Type: multipart/mixed;\n\tboundary=\"{boundary}\"\n");
    }
    out.push('\n');

    // mbox-family multi-message output must escape body lines that look like
    // a separator; one-message-per-file output has no such ambiguity.
    let mboxrd = opts.framing == Framing::Mbox && !opts.one_message_per_file;

    if item.kind == ItemKind::Report {
        if let Some(report) = &email.report_text {
            body::write_body_part(&mut out, report, "text/plain", &body_charset, &boundary, opts.prefer_utf8, mboxrd);
            out.push('\n');
        }
    }

    let has_plain = item.body.is_some();
    let has_html = email.htmlbody.is_some();
    let inner_boundary = if has_plain && has_html {
        let _ = write!(out, "\n--{boundary}\n");
        let _ = write!(out, "Content-Type: multipart/alternative;\n\tboundary=\"{altboundary}\"\n");
        altboundary.as_str()
    } else {
        boundary.as_str()
    };

    if let Some(plain) = &item.body {
        body::write_body_part(&mut out, plain, "text/plain", &body_charset, inner_boundary, opts.prefer_utf8, mboxrd);
    }
    if let Some(html) = &email.htmlbody {
        let html_charset = body::find_html_charset(&html.text).unwrap_or(body_charset.clone());
        body::write_body_part(&mut out, html, "text/html", &html_charset, inner_boundary, opts.prefer_utf8, mboxrd);
    }
    if has_plain && has_html {
        let _ = write!(out, "\n--{altboundary}--\n");
    }

    if item.kind == ItemKind::Schedule {
        write_schedule_part(&mut out, item, &email, &sender, &boundary);
    }

    // RTF body and encrypted bodies are promoted to attachments ahead of any
    // attachments already on the item, then walked through the same
    // extension-filter and inline/sibling-file logic as every other attachment.
    let mut synthetic_attachments = Vec::new();
    if opts.save_rtf_body {
        if let Some(compressed) = &email.rtf_compressed {
            if let Some(decompressed) = rtf_decompressor.decompress(compressed) {
                synthetic_attachments.push(Attachment {
                    method: AttachMethod::ByValue,
                    filename1: None,
                    filename2: Some("rtf-body.rtf".to_string()),
                    mimetype: Some("application/rtf".to_string()),
                    content_id: None,
                    data: Some(decompressed),
                    i_id: None,
                });
            }
        }
    }
    if let Some(encrypted) = &email.encrypted_body {
        synthetic_attachments.push(encrypted_body_attachment(encrypted.clone()));
    }
    if let Some(encrypted) = &email.encrypted_htmlbody {
        synthetic_attachments.push(encrypted_body_attachment(encrypted.clone()));
    }

    // One-message-per-file with MH off writes attachments as sibling files
    // named from the message's own output file; every other mode inlines them.
    let sibling_files = opts.one_message_per_file && opts.framing == Framing::Mbox;
    let mut pending_sibling_files = Vec::new();

    let mut attach_num = 0usize;
    for attach in synthetic_attachments.iter().chain(item.attachments.iter()) {
        match attach.method {
            AttachMethod::Embedded => {
                let _ = write!(out, "\n--{boundary}\n");
                let mime = attach.mimetype.as_deref().unwrap_or("message/rfc822");
                let _ = write!(out, "Content-Type: {mime}\n\n");
                let embedded = attach.i_id.and_then(|id| resolve_embedded.and_then(|f| f(id)));
                if let Some(embedded_item) = embedded {
                    let embed_opts = RenderOptions { embedding: true, ..*opts };
                    let (embedded_text, _, nested_pending) =
                        render_mail(&embedded_item, &embed_opts, None, resolve_embedded, rtf_decompressor);
                    out.push_str(&embedded_text);
                    pending_sibling_files.extend(nested_pending);
                }
            }
            AttachMethod::ByValue | AttachMethod::ByReference => {
                if !sanitize::extension_acceptable(attach.extension().as_deref(), opts.acceptable_extensions) {
                    continue;
                }
                attach_num += 1;
                if sibling_files {
                    let name = attach.display_filename().map(str::to_string).unwrap_or_else(|| format!("attach{attach_num}"));
                    pending_sibling_files.push((name, attach.data.clone().unwrap_or_default()));
                } else {
                    write_inline_attachment(&mut out, attach, &boundary);
                }
            }
        }
    }

    let _ = write!(out, "\n--{boundary}--\n\n");

    (out, extracted_mime_headers, pending_sibling_files)
}

/// An encrypted plain/HTML body promoted to an attachment with no explicit
/// filename or MIME type; `write_inline_attachment` falls back to
/// `application/octet-stream` and `Content-Disposition: inline` for it.
fn encrypted_body_attachment(data: Vec<u8>) -> Attachment {
    Attachment {
        method: AttachMethod::ByValue,
        filename1: None,
        filename2: None,
        mimetype: None,
        content_id: None,
        data: Some(data),
        i_id: None,
    }
}

fn write_inline_attachment(out: &mut String, attach: &crate::model::Attachment, boundary: &str) {
    let _ = write!(out, "\n--{boundary}\n");
    let mime = attach.mimetype.as_deref().unwrap_or("application/octet-stream");
    let _ = write!(out, "Content-Type: {mime}\n");
    out.push_str("Content-Transfer-Encoding: base64\n");

    if let Some(cid) = &attach.content_id {
        let _ = write!(out, "Content-ID: <{cid}>\n");
    }

    match (&attach.filename2, &attach.filename1) {
        (Some(long_name), _) => {
            let escaped = sanitize::backslash_quote(long_name);
            let rfc2231 = sanitize::rfc2231_encode(long_name);
            let _ = write!(out, "Content-Disposition: attachment; \n        filename*={rfc2231};\n");
            let _ = write!(out, "        filename=\"{escaped}\"\n\n");
        }
        (None, Some(short_name)) => {
            let _ = write!(out, "Content-Disposition: attachment; filename=\"{short_name}\"\n\n");
        }
        (None, None) => out.push_str("Content-Disposition: inline\n\n"),
    }

    if let Some(data) = &attach.data {
        let encoded = charset::base64_encode(data);
        for chunk in encoded.as_bytes().chunks(76) {
            out.push_str(std::str::from_utf8(chunk).expect("base64 alphabet is ascii"));
            out.push('\n');
        }
    }
    out.push_str("\n\n");
}

fn write_schedule_part(out: &mut String, item: &Item, email: &EmailFields, sender: &str, boundary: &str) {
    let method = "REQUEST";
    let _ = write!(out, "\n--{boundary}\n");
    let _ = write!(out, "Content-Type: text/calendar; method=\"{method}\"; charset=\"utf-8\"\n\n");
    write_schedule_vcalendar(out, item, email, sender, method);
    out.push('\n');

    let fname = format!("i{}.ics", item.block_id);
    let _ = write!(out, "\n--{boundary}\n");
    let _ = write!(out, "Content-Type: text/calendar; charset=\"utf-8\"; name=\"{fname}\"\n");
    let _ = write!(out, "Content-Disposition: attachment; filename=\"{fname}\"\n\n");
    write_schedule_vcalendar(out, item, email, sender, method);
    out.push('\n');
}

fn write_schedule_vcalendar(out: &mut String, item: &Item, email: &EmailFields, sender: &str, method: &str) {
    out.push_str("BEGIN:VCALENDAR\n");
    out.push_str("VERSION:2.0\n");
    out.push_str("PRODID:pst-extract\n");
    let _ = write!(out, "METHOD:{method}\n");
    out.push_str("BEGIN:VEVENT\n");
    match &email.outlook_sender_name {
        Some(name) => {
            let _ = write!(out, "ORGANIZER;CN=\"{name}\":MAILTO:{sender}\n");
        }
        None => {
            let _ = write!(out, "ORGANIZER;CN=\"\":MAILTO:{sender}\n");
        }
    }
    if let Some(appt) = &item.appointment {
        crate::ical::write_vevent_body(out, item, appt);
    }
    out.push_str("END:VCALENDAR\n");
}

/// Date used when a sent date is unrepresentable, matching the Unix epoch fallback
pub fn epoch() -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.timestamp_opt(0, 0).single().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::RtfDecompressor;
    use crate::model::{FileTime, PstString};

    struct NoopRtf;
    impl RtfDecompressor for NoopRtf {
        fn decompress(&self, _data: &[u8]) -> Option<Vec<u8>> {
            None
        }
    }

    struct FixedRtf(&'static [u8]);
    impl RtfDecompressor for FixedRtf {
        fn decompress(&self, _data: &[u8]) -> Option<Vec<u8>> {
            Some(self.0.to_vec())
        }
    }

    fn base_opts() -> RenderOptions<'static> {
        RenderOptions {
            framing: Framing::Mbox,
            save_rtf_body: true,
            prefer_utf8: false,
            default_charset: "us-ascii",
            embedding: false,
            acceptable_extensions: None,
            one_message_per_file: false,
        }
    }

    fn sample_item() -> Item {
        Item {
            kind: ItemKind::Note,
            file_as: None,
            subject: Some(PstString::utf8("Test subject")),
            body: Some(PstString::utf8("Hello, world.\n")),
            comment: None,
            create_date: None,
            modify_date: None,
            block_id: 42,
            extra_fields: vec![],
            email: Some(EmailFields {
                sender_address: Some("alice@example.com".into()),
                sentto_address: Some("bob@example.com".into()),
                sent_date: Some(FileTime(116_444_736_000_000_000)),
                ..Default::default()
            }),
            contact: None,
            appointment: None,
            journal: None,
            attachments: vec![],
            folder_item_count: None,
        }
    }

    #[test]
    fn render_mail_includes_from_line_and_subject() {
        let item = sample_item();
        let opts = base_opts();
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(rendered.starts_with("From \"alice@example.com\""));
        assert!(rendered.contains("Subject: Test subject"));
        assert!(rendered.contains("To: bob@example.com"));
        assert!(rendered.contains("boundary-LibPST-iamunique-42_-_-"));
    }

    #[test]
    fn render_mail_headers_framing_omits_from_line() {
        let item = sample_item();
        let opts = RenderOptions { framing: Framing::Headers, ..base_opts() };
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(!rendered.starts_with("From "));
    }

    #[test]
    fn render_mail_splices_embedded_message() {
        let mut item = sample_item();
        item.attachments.push(crate::model::Attachment {
            method: AttachMethod::Embedded,
            filename1: None,
            filename2: None,
            mimetype: None,
            content_id: None,
            data: None,
            i_id: Some(99),
        });
        let nested = Item {
            subject: Some(PstString::utf8("Nested subject")),
            block_id: 99,
            ..sample_item()
        };
        let resolve = move |id: u64| if id == 99 { Some(nested.clone()) } else { None };
        let opts = base_opts();
        let (rendered, _, _) = render_mail(&item, &opts, None, Some(&resolve), &NoopRtf);
        assert!(rendered.contains("Content-Type: message/rfc822"));
        assert!(rendered.contains("Nested subject"));
    }

    #[test]
    fn render_mail_falls_back_to_mailer_daemon_sender() {
        let mut item = sample_item();
        item.email.as_mut().unwrap().sender_address = None;
        let opts = base_opts();
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(rendered.starts_with("From \"MAILER-DAEMON\""));
    }

    #[test]
    fn render_mail_drops_attachments_outside_extension_filter() {
        let mut item = sample_item();
        for name in ["a.txt", "b.exe", "noext", "c.PDF"] {
            item.attachments.push(crate::model::Attachment {
                method: AttachMethod::ByValue,
                filename1: None,
                filename2: Some(name.to_string()),
                mimetype: None,
                content_id: None,
                data: Some(b"x".to_vec()),
                i_id: None,
            });
        }
        let allowed: std::collections::HashSet<String> = ["txt", "pdf"].iter().map(|s| s.to_string()).collect();
        let opts = RenderOptions { acceptable_extensions: Some(&allowed), ..base_opts() };
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(rendered.contains("filename=\"a.txt\""));
        assert!(rendered.contains("filename=\"noext\""));
        assert!(rendered.contains("filename=\"c.PDF\""));
        assert!(!rendered.contains("b.exe"));
    }

    #[test]
    fn render_mail_prepends_decompressed_rtf_body_as_attachment() {
        let mut item = sample_item();
        item.email.as_mut().unwrap().rtf_compressed = Some(b"compressed".to_vec());
        let opts = base_opts();
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &FixedRtf(b"{\\rtf1 hi}"));
        assert!(rendered.contains("Content-Type: application/rtf"));
        assert!(rendered.contains("filename=\"rtf-body.rtf\""));
    }

    #[test]
    fn render_mail_skips_rtf_attachment_when_save_rtf_body_disabled() {
        let mut item = sample_item();
        item.email.as_mut().unwrap().rtf_compressed = Some(b"compressed".to_vec());
        let opts = RenderOptions { save_rtf_body: false, ..base_opts() };
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &FixedRtf(b"{\\rtf1 hi}"));
        assert!(!rendered.contains("rtf-body.rtf"));
    }

    #[test]
    fn render_mail_promotes_encrypted_bodies_to_attachments() {
        let mut item = sample_item();
        item.email.as_mut().unwrap().encrypted_body = Some(b"secret-plain".to_vec());
        item.email.as_mut().unwrap().encrypted_htmlbody = Some(b"secret-html".to_vec());
        let opts = base_opts();
        let (rendered, _, _) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(rendered.contains("Content-Type: application/octet-stream"));
        assert!(rendered.contains("Content-Disposition: inline"));
    }

    #[test]
    fn render_mail_writes_sibling_files_in_one_message_per_file_mode() {
        let mut item = sample_item();
        item.attachments.push(crate::model::Attachment {
            method: AttachMethod::ByValue,
            filename1: None,
            filename2: Some("report.pdf".to_string()),
            mimetype: None,
            content_id: None,
            data: Some(b"pdf-bytes".to_vec()),
            i_id: None,
        });
        let opts = RenderOptions { one_message_per_file: true, ..base_opts() };
        let (rendered, _, pending) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(!rendered.contains("report.pdf"));
        assert_eq!(pending, vec![("report.pdf".to_string(), b"pdf-bytes".to_vec())]);
    }

    #[test]
    fn render_mail_inlines_attachments_in_one_message_per_file_mh_mode() {
        let mut item = sample_item();
        item.attachments.push(crate::model::Attachment {
            method: AttachMethod::ByValue,
            filename1: None,
            filename2: Some("report.pdf".to_string()),
            mimetype: None,
            content_id: None,
            data: Some(b"pdf-bytes".to_vec()),
            i_id: None,
        });
        let opts = RenderOptions { one_message_per_file: true, framing: Framing::Headers, ..base_opts() };
        let (rendered, _, pending) = render_mail(&item, &opts, None, None, &NoopRtf);
        assert!(rendered.contains("filename=\"report.pdf\""));
        assert!(pending.is_empty());
    }

    #[test]
    fn render_mail_quotes_from_lines_in_mbox_framing_but_not_one_message_per_file() {
        let mut item = sample_item();
        item.body = Some(PstString::utf8("From the office\n"));
        let mbox_opts = base_opts();
        let (mbox_rendered, _, _) = render_mail(&item, &mbox_opts, None, None, &NoopRtf);
        assert!(mbox_rendered.contains(">From the office\n"));

        let separate_opts = RenderOptions { one_message_per_file: true, ..base_opts() };
        let (separate_rendered, _, _) = render_mail(&item, &separate_opts, None, None, &NoopRtf);
        assert!(separate_rendered.contains("\nFrom the office\n"));
        assert!(!separate_rendered.contains(">From the office"));
    }
}
