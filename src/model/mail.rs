//! The parsed inbound email.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use super::attachment::EmailPart;

/// A fully decoded inbound email.
///
/// Built once by the parser and only read afterwards.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    /// Sender (first `From:` mailbox).
    pub from: EmailAddress,

    /// Primary recipients (`To:`).
    pub to: Vec<EmailAddress>,

    /// Carbon-copy recipients (`Cc:`).
    pub cc: Vec<EmailAddress>,

    /// First `Reply-To:` mailbox, if any.
    pub reply_to: Option<EmailAddress>,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// Parsed `Date:` header, or the time of receipt when missing.
    pub date: DateTime<Utc>,

    /// Plain-text body (first `text/plain` part).
    pub text: Option<String>,

    /// HTML body (first `text/html` part).
    pub html: Option<String>,

    /// File parts in message order.
    pub parts: Vec<EmailPart>,
}

impl InboundEmail {
    /// `Reply-To` only when it points somewhere other than `From`.
    pub fn distinct_reply_to(&self) -> Option<&EmailAddress> {
        self.reply_to
            .as_ref()
            .filter(|reply_to| !reply_to.same_mailbox(&self.from))
    }
}
