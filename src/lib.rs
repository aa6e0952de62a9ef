//! `mailhook`: forwards inbound email to chat webhooks.
//!
//! This crate turns one raw RFC 5322 message into a rich webhook
//! notification: the body converted to chat Markdown, a plain-text archive
//! of the whole message, and as many attachments as the platform's quotas
//! allow. Delivery falls back once to a notification without files when the
//! platform rejects the full payload.

pub mod compose;
pub mod config;
pub mod deliver;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod route;
pub mod triage;
