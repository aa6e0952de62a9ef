//! Plain-text archive of the full original message.
//!
//! The archive is attached to every notification so the complete email
//! survives even when the embed has to be cut down to the platform quotas.

use crate::model::address::display_list;
use crate::model::mail::InboundEmail;

use super::entities::decode_entities;
use super::tokenizer::{Token, Tokenizer};

const RULE_WIDTH: usize = 70;

/// Render the archive document for `email`.
pub fn archive(email: &InboundEmail) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut content = String::new();

    content.push_str(&format!("{rule}\nORIGINAL EMAIL\n{rule}\n"));
    content.push_str(&format!("From:     {}\n", email.from.display()));
    content.push_str(&format!("To:       {}\n", display_list(&email.to)));
    if !email.cc.is_empty() {
        content.push_str(&format!("CC:       {}\n", display_list(&email.cc)));
    }
    if let Some(reply_to) = email.distinct_reply_to() {
        content.push_str(&format!("Reply-To: {}\n", reply_to.display()));
    }
    content.push_str(&format!("Subject:  {}\n", email.subject));
    content.push_str(&format!(
        "Date:     {}\n",
        email.date.format("%a, %d %b %Y %H:%M:%S %z")
    ));

    content.push_str(&format!("{rule}\nBODY\n{rule}\n\n"));
    content.push_str(&archive_body(email));
    content.push_str("\n\n");

    if !email.parts.is_empty() {
        content.push_str(&format!("{rule}\nATTACHMENTS ({})\n", email.parts.len()));
        for part in &email.parts {
            let size = humansize::format_size(part.size(), humansize::BINARY);
            content.push_str(&format!(
                "  - {} ({}, {})\n",
                part.filename, part.content_type, size
            ));
        }
    }

    content.push_str(&format!("{rule}\nEND OF EMAIL\n{rule}\n"));
    content
}

/// Plain text if there is any, else the stripped HTML, else a placeholder.
fn archive_body(email: &InboundEmail) -> String {
    if let Some(text) = email.text.as_deref().filter(|t| !t.trim().is_empty()) {
        return text.replace("\r\n", "\n").trim_end().to_string();
    }
    if let Some(html) = email.html.as_deref() {
        let stripped = strip_html(html);
        if !stripped.is_empty() {
            return stripped;
        }
    }
    "(no content)".to_string()
}

/// Elements whose start and end both break the line in the archive.
const LINE_BREAK_ELEMENTS: &[&str] = &[
    "br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "hr",
    "table",
];

/// Readable text from HTML: block boundaries become line breaks, every tag
/// is dropped. No Markdown markers are produced.
pub fn strip_html(html: &str) -> String {
    let mut decoded = String::with_capacity(html.len());

    for token in Tokenizer::new(html) {
        match token {
            Token::Text(raw) => decoded.push_str(&decode_entities(raw)),
            Token::Start(tag) if LINE_BREAK_ELEMENTS.contains(&tag.name.as_str()) => {
                decoded.push('\n')
            }
            Token::End(name) if LINE_BREAK_ELEMENTS.contains(&name.as_str()) => {
                decoded.push('\n')
            }
            Token::End(name) if name == "td" || name == "th" => decoded.push(' '),
            _ => {}
        }
    }

    // One line per non-empty source line, at most one blank line in a row.
    let mut cleaned = String::with_capacity(decoded.len());
    let mut prev_was_blank = true;
    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::model::address::EmailAddress;
    use crate::model::attachment::EmailPart;

    fn email() -> InboundEmail {
        InboundEmail {
            from: EmailAddress::new("Alice", "alice@example.com"),
            to: vec![
                EmailAddress::new("", "inbox@example.org"),
                EmailAddress::new("Bob", "bob@example.org"),
            ],
            cc: Vec::new(),
            reply_to: None,
            subject: "Quarterly numbers".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap(),
            text: Some("Hi team,\r\nsee attached.\r\n".to_string()),
            html: None,
            parts: Vec::new(),
        }
    }

    #[test]
    fn test_archive_layout() {
        let doc = archive(&email());
        let rule = "=".repeat(70);
        assert!(doc.starts_with(&format!("{rule}\nORIGINAL EMAIL\n{rule}\n")));
        assert!(doc.contains("From:     Alice <alice@example.com>\n"));
        assert!(doc.contains("To:       inbox@example.org, Bob <bob@example.org>\n"));
        assert!(doc.contains("Subject:  Quarterly numbers\n"));
        assert!(doc.contains("Date:     Tue, 02 Jan 2024 10:30:00 +0000\n"));
        assert!(doc.contains("BODY\n"));
        assert!(doc.contains("\n\nHi team,\nsee attached.\n\n"));
        assert!(doc.ends_with(&format!("{rule}\nEND OF EMAIL\n{rule}\n")));
        assert!(!doc.contains("CC:"));
        assert!(!doc.contains("Reply-To:"));
        assert!(!doc.contains("ATTACHMENTS"));
    }

    #[test]
    fn test_archive_optional_headers() {
        let mut e = email();
        e.cc = vec![EmailAddress::new("", "carol@example.net")];
        e.reply_to = Some(EmailAddress::new("", "support@example.com"));
        let doc = archive(&e);
        assert!(doc.contains("CC:       carol@example.net\n"));
        assert!(doc.contains("Reply-To: support@example.com\n"));

        e.reply_to = Some(EmailAddress::new("", "alice@example.com"));
        assert!(!archive(&e).contains("Reply-To:"));
    }

    #[test]
    fn test_archive_lists_parts() {
        let mut e = email();
        e.parts = vec![EmailPart::new("chart.png", "image/png", vec![0u8; 2048])];
        let doc = archive(&e);
        assert!(doc.contains("ATTACHMENTS (1)\n  - chart.png (image/png, 2 KiB)\n"));
    }

    #[test]
    fn test_archive_falls_back_to_html_then_placeholder() {
        let mut e = email();
        e.text = Some("   ".to_string());
        e.html = Some("<p>Hello <b>there</b></p><p>Bye</p>".to_string());
        let doc = archive(&e);
        assert!(doc.contains("\n\nHello there\n\nBye\n\n"));
        assert!(!doc.contains("**"));

        e.html = None;
        e.text = None;
        e.date = DateTime::UNIX_EPOCH;
        assert!(archive(&e).contains("\n\n(no content)\n\n"));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<style>p{}</style><p>A &amp; B</p><br><div>C<script>x</script></div>"),
            "A & B\n\nC"
        );
        assert_eq!(strip_html("no tags"), "no tags");
        assert_eq!(strip_html("<table><tr><td>a</td><td>b</td></tr></table>"), "a b");
    }

    #[test]
    fn test_strip_html_keeps_literal_angle_brackets() {
        assert_eq!(strip_html("<p>3 <5 is false</p>"), "3 <5 is false");
        assert_eq!(
            strip_html("<p>if a < b and c > d then</p>"),
            "if a < b and c > d then"
        );
        assert_eq!(strip_html(r#"<p>x<img alt="a > b" src=y>z</p>"#), "xz");
        assert_eq!(strip_html("<p>1 &lt; 2</p><HEAD><title>t</title></HEAD>"), "1 < 2");
    }
}
