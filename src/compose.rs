//! Notification composition.
//!
//! Every text that ends up in the embed goes through [`truncate`] with the
//! quota of the slot it fills.

use chrono::{DateTime, Utc};

use crate::config::{Limits, NotificationConfig};
use crate::model::address::{display_list, EmailAddress};
use crate::model::mail::InboundEmail;
use crate::model::notification::{EmbedField, ManifestEntry, Notification, ATTACHMENTS_FIELD_NAME};
use crate::triage::TriageReport;

const TITLE_PREFIX: &str = "📧 ";
const FAILURE_TITLE: &str = "⚠️ Email could not be processed";
const NO_SUBJECT: &str = "(no subject)";
const UNKNOWN: &str = "(unknown)";
const ELLIPSIS: &str = "...";
const ARCHIVE_DESCRIPTION: &str = "Full original email";

/// Cut `text` to at most `max` characters.
///
/// Longer text keeps its first `max - 3` characters followed by `...`.
/// Lengths are counted in Unicode scalar values, so a multi-byte character
/// is never split.
pub fn truncate(text: &str, max: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text.to_string();
    };
    if max < ELLIPSIS.len() {
        return text[..cut].to_string();
    }
    let keep = text
        .char_indices()
        .nth(max - ELLIPSIS.len())
        .map_or(text.len(), |(idx, _)| idx);
    format!("{}{ELLIPSIS}", &text[..keep])
}

/// Build the notification for a successfully parsed email.
pub fn compose(
    email: &InboundEmail,
    body: &str,
    report: &TriageReport,
    style: &NotificationConfig,
    limits: &Limits,
) -> Notification {
    let subject = if email.subject.trim().is_empty() {
        NO_SUBJECT
    } else {
        email.subject.trim()
    };

    let mut fields = vec![
        field("From", &mailbox_or_unknown(&email.from), true, limits),
        field("To", &list_or_unknown(&email.to), true, limits),
    ];
    if !email.cc.is_empty() {
        fields.push(field("CC", &display_list(&email.cc), false, limits));
    }
    if let Some(reply_to) = email.distinct_reply_to() {
        fields.push(field("Reply-To", &reply_to.display(), false, limits));
    }

    let summary_field = attachment_summary(report, limits).map(|summary| {
        fields.push(summary);
        fields.len() - 1
    });

    let manifest = report
        .accepted
        .iter()
        .enumerate()
        .map(|(id, attachment)| ManifestEntry {
            id,
            filename: attachment.filename.clone(),
            description: attachment
                .is_archive
                .then(|| ARCHIVE_DESCRIPTION.to_string()),
        })
        .collect();

    Notification {
        title: truncate(&format!("{TITLE_PREFIX}{subject}"), limits.title_max),
        description: (!body.trim().is_empty()).then(|| truncate(body, limits.body_max)),
        color: style.color,
        fields,
        footer: footer(style, limits),
        timestamp: email.date,
        image: report.embed.clone(),
        manifest,
        username: username(style, limits),
        avatar_url: style.avatar_url.clone(),
        summary_field,
    }
}

/// Minimal notification for an email that could not be processed.
///
/// Carries no attachments; only who sent it, where it was going and what
/// went wrong.
pub fn compose_failure(
    sender: &str,
    recipient: &str,
    error: &str,
    style: &NotificationConfig,
    limits: &Limits,
    now: DateTime<Utc>,
) -> Notification {
    let or_unknown = |s: &str| {
        if s.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            s.trim().to_string()
        }
    };

    Notification {
        title: truncate(FAILURE_TITLE, limits.title_max),
        description: Some(truncate(&format!("```\n{error}\n```"), limits.body_max)),
        color: style.color,
        fields: vec![
            field("From", &or_unknown(sender), true, limits),
            field("To", &or_unknown(recipient), true, limits),
        ],
        footer: footer(style, limits),
        timestamp: now,
        image: None,
        manifest: Vec::new(),
        username: username(style, limits),
        avatar_url: style.avatar_url.clone(),
        summary_field: None,
    }
}

/// Summary of accepted and skipped attachments, or `None` when the user
/// sent nothing worth listing.
fn attachment_summary(report: &TriageReport, limits: &Limits) -> Option<EmbedField> {
    let accepted = report.visible_count();
    let skipped = report.skipped.len();
    if accepted == 0 && skipped == 0 {
        return None;
    }

    let mut lines: Vec<String> = report
        .visible()
        .map(|a| {
            let icon = if a.is_image { "🖼️" } else { "📄" };
            let size = humansize::format_size(a.size, humansize::BINARY);
            format!("{icon} {} ({size})", a.filename)
        })
        .collect();
    lines.extend(
        report
            .skipped
            .iter()
            .map(|s| format!("⚠️ {}: {}", s.label, s.reason)),
    );

    let name = if skipped > 0 {
        format!("{ATTACHMENTS_FIELD_NAME} ({accepted}, {skipped} skipped)")
    } else {
        format!("{ATTACHMENTS_FIELD_NAME} ({accepted})")
    };

    Some(field(&name, &lines.join("\n"), false, limits))
}

fn footer(style: &NotificationConfig, limits: &Limits) -> Option<String> {
    style.footer.as_deref().map(|f| truncate(f, limits.footer_max))
}

fn username(style: &NotificationConfig, limits: &Limits) -> Option<String> {
    style
        .username
        .as_deref()
        .map(|u| truncate(u, limits.username_max))
}

fn field(name: &str, value: &str, inline: bool, limits: &Limits) -> EmbedField {
    EmbedField::new(name, truncate(value, limits.field_max), inline)
}

fn mailbox_or_unknown(addr: &EmailAddress) -> String {
    if addr.address.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        addr.display()
    }
}

fn list_or_unknown(list: &[EmailAddress]) -> String {
    if list.is_empty() {
        UNKNOWN.to_string()
    } else {
        display_list(list)
    }
}
