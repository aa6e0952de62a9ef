//! MIME message parsing: headers, bodies and file parts into an [`InboundEmail`].

use chrono::{DateTime, Utc};
use mail_parser::{Address, MessageParser, MimeHeaders, PartType};

use crate::error::{HookError, Result};
use crate::model::address::EmailAddress;
use crate::model::attachment::{EmailPart, DEFAULT_CONTENT_TYPE};
use crate::model::mail::InboundEmail;

/// Parse a complete raw message (headers + body).
///
/// `received_at` stands in for a missing or unparseable `Date:` header.
/// Fails only when the bytes carry no recognizable message at all.
pub fn parse_message(raw_message: &[u8], received_at: DateTime<Utc>) -> Result<InboundEmail> {
    let message_bytes = skip_from_line(raw_message);

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| HookError::InvalidMessage("not an RFC 5322 message".into()))?;

    if msg.from().is_none() && msg.to().is_none() && msg.subject().is_none() {
        return Err(HookError::InvalidMessage(
            "no From, To or Subject header found".into(),
        ));
    }

    let from = msg
        .from()
        .and_then(|a| mailboxes(a).into_iter().next())
        .unwrap_or_default();
    let to = msg.to().map(mailboxes).unwrap_or_default();
    let cc = msg.cc().map(mailboxes).unwrap_or_default();
    let reply_to = msg.reply_to().and_then(|a| mailboxes(a).into_iter().next());

    let date = msg
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or(received_at);

    // `body_text`/`body_html` synthesize one flavor from the other; only take
    // what the sender actually provided.
    let text = msg.text_bodies().find_map(|part| match &part.body {
        PartType::Text(text) => Some(text.to_string()),
        _ => None,
    });
    let html = msg.html_bodies().find_map(|part| match &part.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    });

    let parts = msg
        .attachments()
        .enumerate()
        .map(|(idx, part)| {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
                .to_ascii_lowercase();

            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| generated_name(idx + 1, &content_type));

            EmailPart {
                filename,
                content_type,
                content: part.contents().to_vec(),
                content_id: part
                    .content_id()
                    .map(|id| id.trim_matches(['<', '>']).to_string()),
            }
        })
        .collect();

    Ok(InboundEmail {
        from,
        to,
        cc,
        reply_to,
        subject: msg.subject().unwrap_or_default().trim().to_string(),
        date,
        text,
        html,
        parts,
    })
}

/// Flatten an address header (lists and groups) into mailboxes.
fn mailboxes(address: &Address<'_>) -> Vec<EmailAddress> {
    address
        .iter()
        .filter_map(|addr| {
            let address = addr.address()?.trim();
            if address.is_empty() {
                return None;
            }
            Some(EmailAddress::new(addr.name().unwrap_or("").trim(), address))
        })
        .collect()
}

/// Name for a part that did not declare one: `attachment_3.png`.
fn generated_name(position: usize, content_type: &str) -> String {
    let ext = match content_type {
        "message/rfc822" => "eml",
        "text/plain" => "txt",
        "image/jpeg" => "jpg",
        ct => ct
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin"),
    };
    format!("attachment_{position}.{ext}")
}

/// Skip a leading BOM and an mbox `From ` separator line, as written by
/// local delivery agents that hand over mbox-framed messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
