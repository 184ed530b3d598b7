use std::borrow::Cow;

use mailparse::{MailHeaderMap, ParsedMail};

/// Invalid UTF-8 is replaced, never rejected.
pub fn decode_lossy(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

/// mbox files open with a `From sender date` envelope line that is not a
/// header; drop it so the first message parses.
pub fn strip_mbox_envelope(text: &str) -> &str {
    if text.starts_with("From ") {
        match text.find('\n') {
            Some(idx) => &text[idx + 1..],
            None => "",
        }
    } else {
        text
    }
}

/// First value of a header, RFC 2047 decoded, trimmed; blank counts as absent.
pub fn header_first(mail: &ParsedMail, name: &str) -> Option<String> {
    mail.headers
        .get_first_value(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Removes every `<...>` span that holds no other `<`. A stray `<` and the
/// text after it stay. Entities are left as they are.
pub fn strip_html_minimal(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut tag: Option<String> = None;
    for ch in html.chars() {
        match ch {
            '<' => {
                if let Some(open) = tag.take() {
                    out.push_str(&open);
                }
                tag = Some(String::from("<"));
            }
            '>' if tag.is_some() => tag = None,
            _ => match tag.as_mut() {
                Some(open) => open.push(ch),
                None => out.push(ch),
            },
        }
    }
    if let Some(rest) = tag {
        out.push_str(&rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_but_keeps_entities() {
        let html = "<html><body><p>Hello &amp; <b>welcome</b></p></body></html>";
        assert_eq!(strip_html_minimal(html), "Hello &amp; welcome");
    }

    #[test]
    fn unmatched_close_bracket_is_text() {
        assert_eq!(strip_html_minimal("a > b <i>c</i>"), "a > b c");
    }

    #[test]
    fn stray_open_bracket_keeps_following_text() {
        assert_eq!(
            strip_html_minimal("<p>Only if x < 5 do we ship.</p> Thanks, Bob"),
            "Only if x < 5 do we ship. Thanks, Bob"
        );
    }

    #[test]
    fn unclosed_tail_is_kept() {
        assert_eq!(strip_html_minimal("<b>total</b> a<b"), "total a<b");
    }

    #[test]
    fn envelope_line_removed_only_for_mbox_prefix() {
        let mbox = "From alice@example.com Mon Jan 15 10:30:00 2024\nSubject: hi\n\nbody";
        assert_eq!(strip_mbox_envelope(mbox), "Subject: hi\n\nbody");
        let eml = "From: alice@example.com\nSubject: hi\n\nbody";
        assert_eq!(strip_mbox_envelope(eml), eml);
    }

    #[test]
    fn lossy_decode_replaces_invalid_bytes() {
        let raw = b"Subject: caf\xe9\n";
        assert!(decode_lossy(raw).contains('\u{FFFD}'));
    }
}
