//! Webhook delivery with a single degrade-and-retry.
//!
//! The full tier sends the notification together with every accepted file.
//! If the platform rejects that payload as malformed or too large, the
//! notification is stripped of everything that refers to files and sent
//! once more on its own. Nothing else is retried.

pub mod http;

use std::fmt;

use crate::error::Result;
use crate::model::notification::{Notification, WebhookPayload};
use crate::triage::TriagedAttachment;

pub use http::HttpTransport;

/// Replaces the attachment summary when files had to be dropped.
pub const DEGRADED_NOTICE: &str =
    "⚠️ Attachments were rejected by the platform and have been removed. \
     The full message is still available at the original mailbox.";

/// Statuses that mean "this payload was refused", as opposed to the
/// destination or the service being unavailable.
const REJECTION_STATUSES: [u16; 2] = [400, 413];

/// One file part of a multipart request.
#[derive(Debug, Clone, Copy)]
pub struct OutboundFile<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> From<&'a TriagedAttachment> for OutboundFile<'a> {
    fn from(attachment: &'a TriagedAttachment) -> Self {
        Self {
            filename: &attachment.filename,
            content_type: &attachment.content_type,
            bytes: &attachment.content,
        }
    }
}

/// What the webhook endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_rejection(&self) -> bool {
        REJECTION_STATUSES.contains(&self.status)
    }
}

/// Sends one webhook request.
///
/// `files` is `None` for a JSON-only request. Otherwise the payload goes out
/// as the `payload_json` part followed by `files[i]` in slice order.
/// An `Err` means no response was received at all.
pub trait Transport {
    fn send(
        &self,
        url: &str,
        payload: &WebhookPayload,
        files: Option<&[OutboundFile<'_>]>,
    ) -> Result<TransportResponse>;
}

/// Which form of the notification a request carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Notification plus attachments.
    Full,
    /// Notification alone, after a rejection.
    Degraded,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Result of one delivery, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        tier: Tier,
    },
    Failed {
        /// Tier of the last attempt.
        tier: Tier,
        /// HTTP status, when a response came back.
        status: Option<u16>,
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::Delivered { tier } | Self::Failed { tier, .. } => *tier,
        }
    }
}

/// Drives a [`Transport`] through the two delivery tiers.
pub struct DeliveryEngine<T> {
    transport: T,
}

impl<T: Transport> DeliveryEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `notification` with `attachments` to `url`.
    ///
    /// Never fails; every problem ends up in the returned outcome and the log.
    pub fn deliver(
        &self,
        url: &str,
        mut notification: Notification,
        attachments: &[TriagedAttachment],
    ) -> DeliveryOutcome {
        let files: Vec<OutboundFile<'_>> = attachments.iter().map(OutboundFile::from).collect();
        let files = (!files.is_empty()).then_some(files.as_slice());

        tracing::debug!(
            files = files.map_or(0, <[_]>::len),
            "Sending notification"
        );

        let response = match self.transport.send(url, &notification.to_payload(), files) {
            Ok(response) => response,
            Err(e) => return failed(Tier::Full, None, e.to_string()),
        };
        if response.is_success() {
            tracing::info!(tier = %Tier::Full, status = response.status, "Notification delivered");
            return DeliveryOutcome::Delivered { tier: Tier::Full };
        }
        if !response.is_rejection() {
            return failed(Tier::Full, Some(response.status), reason_of(&response));
        }

        tracing::warn!(
            status = response.status,
            body = response.body.as_deref().unwrap_or(""),
            "Payload rejected, retrying without attachments"
        );
        notification.degrade(DEGRADED_NOTICE);

        match self.transport.send(url, &notification.to_payload(), None) {
            Ok(retry) if retry.is_success() => {
                tracing::info!(tier = %Tier::Degraded, status = retry.status, "Notification delivered");
                DeliveryOutcome::Delivered {
                    tier: Tier::Degraded,
                }
            }
            Ok(retry) => failed(Tier::Degraded, Some(retry.status), reason_of(&retry)),
            Err(e) => failed(Tier::Degraded, None, e.to_string()),
        }
    }
}

fn reason_of(response: &TransportResponse) -> String {
    match response.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => format!("HTTP {}: {body}", response.status),
        _ => format!("HTTP {}", response.status),
    }
}

fn failed(tier: Tier, status: Option<u16>, reason: String) -> DeliveryOutcome {
    tracing::error!(%tier, status, %reason, "Notification delivery failed");
    DeliveryOutcome::Failed {
        tier,
        status,
        reason,
    }
}
