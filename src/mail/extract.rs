use std::path::Path;

use chrono::{DateTime, Local, Utc};
use mailparse::{DispositionType, MailParseError, ParsedMail};

use crate::domain::email::{
    DEFAULT_SENDER, DEFAULT_SUBJECT, EmailRecord, NO_CONTENT_SENTINEL,
};
use crate::error::IngestError;
use crate::mail::decoders::{decode_lossy, header_first, strip_html_minimal, strip_mbox_envelope};
use crate::mail::fingerprint::fingerprint;
use crate::mail::labels::{determine_priority, extract_labels};

/// Parse one email file into a record. Missing headers get defaults; only a
/// structural parse failure is an error.
pub fn extract(raw: &[u8], source_path: &Path) -> Result<EmailRecord, IngestError> {
    let now = Local::now().to_rfc3339();
    extract_at(raw, source_path, &now)
}

/// Same as [`extract`] with an explicit fallback timestamp for undated mail.
pub fn extract_at(raw: &[u8], source_path: &Path, now: &str) -> Result<EmailRecord, IngestError> {
    let text = decode_lossy(raw);
    let text = strip_mbox_envelope(&text);

    let parsed = mailparse::parse_mail(text.as_bytes()).map_err(|e| IngestError::Extraction {
        path: source_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let subject = header_first(&parsed, "Subject").unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
    let sender = header_first(&parsed, "From").unwrap_or_else(|| DEFAULT_SENDER.to_string());
    let date = header_first(&parsed, "Date")
        .and_then(|d| normalize_date(&d))
        .unwrap_or_else(|| now.to_string());

    let body = select_body(&parsed).map_err(|e| IngestError::Extraction {
        path: source_path.to_path_buf(),
        reason: format!("undecodable body: {e}"),
    })?;
    let attachment_count = count_attachments(&parsed);
    let labels = extract_labels(&subject, &sender);
    let priority = determine_priority(&subject, &sender);
    let fingerprint = fingerprint(&subject, &sender, &date);

    Ok(EmailRecord {
        body,
        subject,
        sender,
        date,
        source_path: source_path.to_path_buf(),
        has_attachments: attachment_count > 0,
        attachment_count,
        labels,
        priority,
        fingerprint,
    })
}

/// RFC 2822 dates keep their offset; anything only `dateparse` understands is
/// rendered in UTC.
fn normalize_date(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.to_rfc3339());
    }
    mailparse::dateparse(raw)
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
}

/// A text part that cannot be transfer-decoded is an error, not an empty body.
fn select_body(mail: &ParsedMail) -> Result<String, MailParseError> {
    if let Some(part) = first_part_of_type(mail, "text/plain") {
        let plain = part.get_body()?;
        let plain = plain.trim();
        if !plain.is_empty() {
            return Ok(plain.to_string());
        }
    }

    if let Some(part) = first_part_of_type(mail, "text/html") {
        let html = part.get_body()?;
        let text = strip_html_minimal(&html);
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }

    Ok(NO_CONTENT_SENTINEL.to_string())
}

/// Depth-first, the part itself before its children.
fn first_part_of_type<'a>(mail: &'a ParsedMail<'a>, mimetype: &str) -> Option<&'a ParsedMail<'a>> {
    if mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        return Some(mail);
    }
    mail.subparts
        .iter()
        .find_map(|part| first_part_of_type(part, mimetype))
}

fn count_attachments(mail: &ParsedMail) -> usize {
    let own = usize::from(is_attachment(mail));
    own + mail.subparts.iter().map(count_attachments).sum::<usize>()
}

fn is_attachment(part: &ParsedMail) -> bool {
    let disposition = part.get_content_disposition();
    disposition.params.contains_key("filename")
        || part.ctype.params.contains_key("name")
        || (matches!(disposition.disposition, DispositionType::Attachment)
            && !part.ctype.mimetype.starts_with("multipart/"))
}
