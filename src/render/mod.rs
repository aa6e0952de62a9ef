//! Text rendering: HTML → Markdown for the notification body, and the
//! plain-text archive document.

pub mod archive;
pub mod entities;
pub mod markup;
pub mod tokenizer;

use crate::model::mail::InboundEmail;

/// Shown when the email has no usable body at all.
pub const NO_CONTENT: &str = "*(no content)*";

/// The notification body for `email`.
///
/// Prefers the converted HTML body, then the plain-text body, then
/// [`NO_CONTENT`].
pub fn body_text(email: &InboundEmail) -> String {
    if let Some(html) = email.html.as_deref() {
        let converted = markup::convert(html);
        if !converted.is_empty() {
            return converted;
        }
        tracing::debug!("HTML body converted to nothing, falling back to plain text");
    }

    if let Some(text) = email.text.as_deref() {
        let text = markup::normalize(text);
        if !text.is_empty() {
            return text;
        }
    }

    NO_CONTENT.to_string()
}
