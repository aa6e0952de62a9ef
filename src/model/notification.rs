//! The composed chat notification and its webhook wire format.
//!
//! [`Notification`] is the domain object built by the composer. It is turned
//! into a [`WebhookPayload`] (the JSON body, or the `payload_json` part of a
//! multipart request) right before every send.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Name of the field appended by [`Notification::degrade`] when the
/// notification had no attachment summary to overwrite.
pub const ATTACHMENTS_FIELD_NAME: &str = "📎 Attachments";

/// One name/value row of the embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    /// Layout hint: render side by side with neighbouring inline fields.
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Metadata for one uploaded file. `id` is the index of the matching
/// multipart `files[id]` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub id: usize,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Filename of the accepted attachment shown as the embed image.
    pub image: Option<String>,
    pub manifest: Vec<ManifestEntry>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    /// Index into `fields` of the attachment summary, if one was added.
    pub summary_field: Option<usize>,
}

impl Notification {
    /// `attachment://<filename>` reference for the embed image.
    pub fn image_url(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|filename| format!("attachment://{filename}"))
    }

    /// Strip everything that refers to uploaded files and explain why.
    ///
    /// The summary field's value becomes `notice`; without a summary field a
    /// new field carrying the notice is appended.
    pub fn degrade(&mut self, notice: &str) {
        self.image = None;
        self.manifest.clear();

        match self.summary_field.and_then(|idx| self.fields.get_mut(idx)) {
            Some(field) => field.value = notice.to_string(),
            None => {
                self.fields
                    .push(EmbedField::new(ATTACHMENTS_FIELD_NAME, notice, false));
                self.summary_field = Some(self.fields.len() - 1);
            }
        }
    }

    /// Build the wire representation.
    pub fn to_payload(&self) -> WebhookPayload {
        WebhookPayload {
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            embeds: vec![Embed {
                title: self.title.clone(),
                description: self.description.clone(),
                color: self.color,
                fields: self.fields.clone(),
                footer: self.footer.clone().map(|text| EmbedFooter { text }),
                timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                image: self.image_url().map(|url| EmbedImage { url }),
            }],
            attachments: self.manifest.clone(),
        }
    }
}

// ── Wire format ─────────────────────────────────────────────────

/// Top-level webhook execute body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}
