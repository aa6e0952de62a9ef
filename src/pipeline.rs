//! One inbound email, end to end.
//!
//! parse → body + archive → triage → compose → deliver. Every path ends in
//! a [`Disposition`]; nothing escapes [`process`] as an error.

use chrono::{DateTime, Utc};

use crate::compose::{compose, compose_failure};
use crate::config::Config;
use crate::deliver::{DeliveryEngine, DeliveryOutcome, Transport};
use crate::error::Result;
use crate::model::attachment::EmailPart;
use crate::model::notification::Notification;
use crate::parser::parse_message;
use crate::render::{archive::archive, body_text};
use crate::route::DestinationResolver;
use crate::triage::{triage, TriageReport};

const ARCHIVE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// SMTP envelope of the inbound message.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    /// Envelope sender (`MAIL FROM`), if known.
    pub from: Option<String>,
    /// Envelope recipient (`RCPT TO`), used for routing.
    pub to: String,
}

/// What happened to an inbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A destination was found and delivery was attempted.
    Accepted { outcome: DeliveryOutcome },
    /// No destination is configured for the recipient.
    Rejected { reason: String },
}

/// A composed notification and the files that go with it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub notification: Notification,
    pub report: TriageReport,
}

/// Everything up to (not including) delivery.
pub fn prepare(raw: &[u8], config: &Config, received_at: DateTime<Utc>) -> Result<Prepared> {
    let email = parse_message(raw, received_at)?;
    tracing::debug!(
        subject = %email.subject,
        parts = email.parts.len(),
        html = email.html.is_some(),
        "Message parsed"
    );

    let body = body_text(&email);
    let archive_part = EmailPart::new(
        config.notification.archive_name.as_str(),
        ARCHIVE_CONTENT_TYPE,
        archive(&email).into_bytes(),
    );
    let report = triage(archive_part, &email.parts, &config.limits);
    let notification = compose(
        &email,
        &body,
        &report,
        &config.notification,
        &config.limits,
    );

    Ok(Prepared {
        notification,
        report,
    })
}

/// Turn `raw` into a notification and deliver it.
///
/// A message that cannot be processed is still reported, through a minimal
/// notification without attachments.
pub fn process<T: Transport>(
    raw: &[u8],
    envelope: &Envelope,
    config: &Config,
    resolver: &dyn DestinationResolver,
    engine: &DeliveryEngine<T>,
) -> Disposition {
    let Some(url) = resolver.resolve(&envelope.to) else {
        tracing::warn!(recipient = %envelope.to, "No destination for recipient, rejecting");
        return Disposition::Rejected {
            reason: format!("no destination configured for {}", envelope.to),
        };
    };

    let now = Utc::now();
    let outcome = match prepare(raw, config, now) {
        Ok(prepared) => engine.deliver(&url, prepared.notification, &prepared.report.accepted),
        Err(e) => {
            tracing::warn!(error = %e, "Message could not be processed, sending failure notice");
            let notice = compose_failure(
                envelope.from.as_deref().unwrap_or(""),
                &envelope.to,
                &e.to_string(),
                &config.notification,
                &config.limits,
                now,
            );
            engine.deliver(&url, notice, &[])
        }
    };

    Disposition::Accepted { outcome }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::deliver::{OutboundFile, Tier, TransportResponse};
    use crate::model::notification::WebhookPayload;
    use crate::route::Router;

    const SIMPLE: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: inbox@example.org\r\n\
Subject: Hello\r\n\
Date: Mon, 01 Jan 2024 12:00:00 +0000\r\n\
Content-Type: text/plain\r\n\
\r\n\
Hi there.\r\n";

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, WebhookPayload, usize)>>,
    }

    impl Transport for Recorder {
        fn send(
            &self,
            url: &str,
            payload: &WebhookPayload,
            files: Option<&[OutboundFile<'_>]>,
        ) -> Result<TransportResponse> {
            self.calls.borrow_mut().push((
                url.to_string(),
                payload.clone(),
                files.map_or(0, <[_]>::len),
            ));
            Ok(TransportResponse {
                status: 204,
                body: None,
            })
        }
    }

    fn router() -> Router {
        Router::default().with_fixed(Some("https://hook/1"))
    }

    #[test]
    fn test_prepare() {
        let now = Utc::now();
        let prepared = prepare(SIMPLE, &Config::default(), now).unwrap();
        assert_eq!(prepared.notification.title, "📧 Hello");
        assert_eq!(prepared.notification.description.as_deref(), Some("Hi there."));
        assert_eq!(prepared.report.accepted.len(), 1);
        assert_eq!(prepared.report.accepted[0].filename, "email.txt");
        assert_ne!(prepared.notification.timestamp, now);
    }

    #[test]
    fn test_process_delivers_archive() {
        let engine = DeliveryEngine::new(Recorder::default());
        let envelope = Envelope {
            from: None,
            to: "inbox@example.org".to_string(),
        };
        let disposition = process(SIMPLE, &envelope, &Config::default(), &router(), &engine);
        assert_eq!(
            disposition,
            Disposition::Accepted {
                outcome: DeliveryOutcome::Delivered { tier: Tier::Full }
            }
        );

        let calls = engine.transport().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://hook/1");
        assert_eq!(calls[0].2, 1);
    }

    #[test]
    fn test_process_rejects_unrouted() {
        let engine = DeliveryEngine::new(Recorder::default());
        let envelope = Envelope {
            from: None,
            to: "nobody@example.org".to_string(),
        };
        let disposition = process(SIMPLE, &envelope, &Config::default(), &Router::default(), &engine);
        assert!(matches!(disposition, Disposition::Rejected { .. }));
        assert!(engine.transport().calls.borrow().is_empty());
    }

    #[test]
    fn test_process_unparseable_sends_failure_notice() {
        let engine = DeliveryEngine::new(Recorder::default());
        let envelope = Envelope {
            from: Some("bounce@example.com".to_string()),
            to: "inbox@example.org".to_string(),
        };
        let disposition = process(b"", &envelope, &Config::default(), &router(), &engine);
        assert!(matches!(disposition, Disposition::Accepted { .. }));

        let calls = engine.transport().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, 0);
        let embed = &calls[0].1.embeds[0];
        assert_eq!(embed.fields[0].value, "bounce@example.com");
        assert_eq!(embed.fields[1].value, "inbox@example.org");
        assert!(calls[0].1.attachments.is_empty());
    }
}
