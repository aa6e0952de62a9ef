//! HTML to chat Markdown conversion.
//!
//! The tokenizer resolves removed elements and tag boundaries first; this
//! module only maps the resulting tag stream onto Markdown markers:
//!
//! | HTML                          | Markdown                 |
//! |-------------------------------|--------------------------|
//! | `h1`–`h6`                     | `#`–`######` + blank line |
//! | `b`, `strong`                 | `**x**`                  |
//! | `i`, `em`                     | `*x*`                    |
//! | `u`                           | `__x__`                  |
//! | `s`, `strike`, `del`          | `~~x~~`                  |
//! | `code` / `pre`                | `` `x` `` / fenced block |
//! | `a href`                      | `[text](url)`            |
//! | `li`                          | `- item`                 |
//! | `blockquote`                  | `> ` per line            |
//! | `hr`                          | `---`                    |
//! | `img`                         | removed                  |

use super::entities::decode_entities;
use super::tokenizer::{Tag, Token, Tokenizer};

/// Convert an HTML document to Markdown. Never fails; malformed markup
/// degrades to its text content.
pub fn convert(html: &str) -> String {
    let mut writer = Writer::default();
    for token in Tokenizer::new(html) {
        match token {
            Token::Text(text) => writer.text(text),
            Token::Start(tag) => writer.start(&tag),
            Token::End(name) => writer.end(&name),
        }
    }
    normalize(&writer.finish())
}

/// Elements whose boundaries start a new line.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "table", "tr", "section", "article", "header", "footer", "main", "nav", "aside",
    "center", "form", "dl", "dt", "dd", "address", "figure", "figcaption",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Quote,
    Link,
}

/// A region whose text must be post-processed as a whole when it closes.
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    href: Option<String>,
    buf: String,
}

#[derive(Debug, Default)]
struct Writer {
    out: String,
    frames: Vec<Frame>,
    pre_depth: usize,
    /// Inline marker that was just opened and has no content yet.
    open_marker: Option<&'static str>,
}

impl Writer {
    fn buf(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.buf,
            None => &mut self.out,
        }
    }

    fn at_line_start(&mut self) -> bool {
        let buf = self.buf();
        buf.is_empty() || buf.ends_with('\n')
    }

    fn push(&mut self, s: &str) {
        self.open_marker = None;
        self.buf().push_str(s);
    }

    /// Make sure the next output starts on a fresh line.
    fn line_break(&mut self) {
        if !self.at_line_start() {
            self.push("\n");
        }
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        if self.pre_depth > 0 {
            self.push(&decoded);
            return;
        }

        let collapsed = collapse_whitespace(&decoded);
        let mut text = collapsed.as_str();

        // Keep `** bold**` from happening: hoist the space before the marker.
        if let Some(marker) = self.open_marker.take() {
            if text.starts_with(' ') {
                let buf = self.buf();
                buf.truncate(buf.len() - marker.len());
                let needs_space = !(buf.is_empty() || buf.ends_with('\n') || buf.ends_with(' '));
                if needs_space {
                    buf.push(' ');
                }
                buf.push_str(marker);
                text = text.trim_start();
            }
        }

        let skip_leading = {
            let buf = self.buf();
            buf.is_empty() || buf.ends_with('\n') || buf.ends_with(' ')
        };
        if skip_leading {
            text = text.trim_start();
        }
        if !text.is_empty() {
            self.push(text);
        }
    }

    fn open_inline(&mut self, marker: &'static str) {
        self.push(marker);
        self.open_marker = Some(marker);
    }

    fn close_inline(&mut self, marker: &'static str) {
        if self.open_marker.take() == Some(marker) {
            // Empty element: drop the opening marker instead of emitting `****`.
            let buf = self.buf();
            buf.truncate(buf.len() - marker.len());
            return;
        }
        let buf = self.buf();
        let trimmed = buf.trim_end_matches(' ').len();
        let had_space = trimmed < buf.len();
        buf.truncate(trimmed);
        buf.push_str(marker);
        if had_space {
            buf.push(' ');
        }
    }

    fn start(&mut self, tag: &Tag) {
        let name = tag.name.as_str();
        // Preformatted content is kept verbatim: inner tags emit nothing.
        if self.pre_depth > 0 && name != "pre" {
            if name == "br" {
                self.push("\n");
            }
            return;
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.line_break();
                let level = usize::from(name.as_bytes()[1] - b'0');
                self.push(&format!("{} ", "#".repeat(level)));
            }
            "b" | "strong" => self.open_inline("**"),
            "i" | "em" => self.open_inline("*"),
            "u" => self.open_inline("__"),
            "s" | "strike" | "del" => self.open_inline("~~"),
            "code" => self.open_inline("`"),
            "pre" => {
                self.line_break();
                self.push("```\n");
                self.pre_depth += 1;
            }
            "a" if !tag.self_closing => {
                let href = tag
                    .attr("href")
                    .map(|h| decode_entities(h.trim()))
                    .filter(|h| is_linkable(h));
                self.open_frame(FrameKind::Link, href);
            }
            "li" => {
                self.line_break();
                self.push("- ");
            }
            "ul" | "ol" => self.line_break(),
            "blockquote" if !tag.self_closing => {
                self.line_break();
                self.open_frame(FrameKind::Quote, None);
            }
            "br" => self.push("\n"),
            "hr" => {
                self.line_break();
                self.push("---\n");
            }
            _ if BLOCK_ELEMENTS.contains(&name) => self.line_break(),
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        if self.pre_depth > 0 && name != "pre" {
            return;
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.push("\n\n"),
            "b" | "strong" => self.close_inline("**"),
            "i" | "em" => self.close_inline("*"),
            "u" => self.close_inline("__"),
            "s" | "strike" | "del" => self.close_inline("~~"),
            "code" => self.close_inline("`"),
            "pre" if self.pre_depth > 0 => {
                self.pre_depth -= 1;
                self.line_break();
                self.push("```\n");
            }
            "a" => self.close_frame(FrameKind::Link),
            "li" => self.push("\n"),
            "ul" | "ol" => self.line_break(),
            "blockquote" => self.close_frame(FrameKind::Quote),
            "p" => self.push("\n\n"),
            "td" | "th" => self.push(" "),
            _ if BLOCK_ELEMENTS.contains(&name) => self.push("\n"),
            _ => {}
        }
    }

    fn open_frame(&mut self, kind: FrameKind, href: Option<String>) {
        self.open_marker = None;
        self.frames.push(Frame {
            kind,
            href,
            buf: String::new(),
        });
    }

    /// Close the innermost frame of `kind`, flushing any frames left open
    /// inside it. A stray end tag with no open frame is ignored.
    fn close_frame(&mut self, kind: FrameKind) {
        if !self.frames.iter().any(|f| f.kind == kind) {
            return;
        }
        while let Some(frame) = self.frames.pop() {
            let done = frame.kind == kind;
            self.flush_frame(frame);
            if done {
                break;
            }
        }
    }

    fn flush_frame(&mut self, frame: Frame) {
        match frame.kind {
            FrameKind::Link => {
                let text = frame.buf.trim();
                let rendered = match frame.href {
                    Some(url) if !text.is_empty() && !text.contains('\n') => {
                        format!("[{text}]({url})")
                    }
                    _ => text.to_string(),
                };
                if !rendered.is_empty() {
                    self.push(&rendered);
                }
            }
            FrameKind::Quote => {
                let inner = normalize(&frame.buf);
                self.line_break();
                if inner.is_empty() {
                    return;
                }
                let mut quoted = String::with_capacity(inner.len() + 16);
                for line in inner.lines() {
                    if line.is_empty() {
                        quoted.push_str(">\n");
                    } else {
                        quoted.push_str("> ");
                        quoted.push_str(line);
                        quoted.push('\n');
                    }
                }
                self.push(&quoted);
            }
        }
    }

    fn finish(mut self) -> String {
        while let Some(frame) = self.frames.pop() {
            self.flush_frame(frame);
        }
        if self.pre_depth > 0 {
            self.line_break();
            self.push("```\n");
        }
        self.out
    }
}

/// Links to fragments or scripts are not worth rendering.
fn is_linkable(href: &str) -> bool {
    !href.is_empty()
        && !href.starts_with('#')
        && !href.to_ascii_lowercase().starts_with("javascript:")
}

/// Collapse every whitespace run into a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

/// Unify line endings, strip trailing spaces, allow at most one blank line
/// in a row, and trim the whole text.
pub(crate) fn normalize(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}
