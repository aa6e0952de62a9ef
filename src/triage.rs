//! Attachment triage against the platform's file quotas.
//!
//! The archive document always comes first and always gets a slot. Every
//! other part is then taken in message order, first come first served:
//! parts over the byte quota are skipped as too large, parts arriving after
//! the count quota is used up are skipped as over the count. Nothing is
//! reordered to fit more files in.

use std::collections::HashSet;
use std::fmt;

use crate::config::Limits;
use crate::model::attachment::EmailPart;

/// Name used when sanitizing leaves nothing behind.
const FALLBACK_NAME: &str = "attachment";

/// A file that will be uploaded with the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriagedAttachment {
    /// Sanitized, unique filename.
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub size: u64,
    pub is_image: bool,
    pub content_id: Option<String>,
    /// `true` for the generated archive document.
    pub is_archive: bool,
}

/// Why a part was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    CountExceeded { limit: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, limit } => write!(
                f,
                "too large ({} > {})",
                humansize::format_size(*size, humansize::BINARY),
                humansize::format_size(*limit, humansize::BINARY)
            ),
            Self::CountExceeded { limit } => {
                write!(f, "count exceeded (max {limit} files per message)")
            }
        }
    }
}

/// A part that was not attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAttachment {
    /// Sanitized filename, for display.
    pub label: String,
    pub reason: SkipReason,
}

/// Outcome of [`triage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriageReport {
    /// Accepted files in upload order; index 0 is the archive.
    pub accepted: Vec<TriagedAttachment>,
    /// Skipped parts in message order.
    pub skipped: Vec<SkippedAttachment>,
    /// Filename of the first accepted image.
    pub embed: Option<String>,
}

impl TriageReport {
    /// Accepted files the user sent (everything but the archive).
    pub fn visible(&self) -> impl Iterator<Item = &TriagedAttachment> {
        self.accepted.iter().filter(|a| !a.is_archive)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }
}

/// Decide which files go out with the notification.
pub fn triage(archive: EmailPart, parts: &[EmailPart], limits: &Limits) -> TriageReport {
    let mut report = TriageReport::default();
    let mut taken = HashSet::new();

    let archive_name = unique_name(
        &sanitize_filename(&archive.filename, limits.filename_max),
        &mut taken,
        limits.filename_max,
    );
    report.accepted.push(TriagedAttachment {
        filename: archive_name,
        size: archive.size(),
        is_image: false,
        content_type: archive.content_type,
        content: archive.content,
        content_id: None,
        is_archive: true,
    });

    for part in parts {
        let label = sanitize_filename(&part.filename, limits.filename_max);
        let size = part.size();

        let reason = if size > limits.max_file_bytes {
            Some(SkipReason::TooLarge {
                size,
                limit: limits.max_file_bytes,
            })
        } else if report.accepted.len() >= limits.max_files {
            Some(SkipReason::CountExceeded {
                limit: limits.max_files,
            })
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::warn!(filename = %label, size, %reason, "Skipping attachment");
            report.skipped.push(SkippedAttachment { label, reason });
            continue;
        }

        let filename = unique_name(&label, &mut taken, limits.filename_max);
        let is_image = part.is_image();
        if is_image && report.embed.is_none() {
            report.embed = Some(filename.clone());
        }
        report.accepted.push(TriagedAttachment {
            filename,
            content_type: part.content_type.clone(),
            content: part.content.clone(),
            size,
            is_image,
            content_id: part.content_id.clone(),
            is_archive: false,
        });
    }

    report
}

/// Make `name` safe as an upload filename.
///
/// Characters that are illegal in filenames on common systems become `_`,
/// whitespace runs collapse into one `_`, and the result is capped at
/// `max_len` characters.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len().min(max_len * 4));
    let mut in_ws = false;

    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push('_');
            }
            in_ws = true;
            continue;
        }
        in_ws = false;
        if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let capped: String = out.chars().take(max_len).collect();
    if capped.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        capped
    }
}

/// Reserve `name` in `taken`, appending `_1`, `_2`, … before the extension
/// until it is unused. The stem is shortened so the result still fits
/// `max_len` characters.
fn unique_name(name: &str, taken: &mut HashSet<String>, max_len: usize) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    for i in 1.. {
        let suffix = format!("_{i}{ext}");
        let room = max_len.saturating_sub(suffix.chars().count());
        let stem: String = stem.chars().take(room).collect();
        let candidate = format!("{stem}{suffix}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }
    unreachable!("the counter is unbounded")
}
