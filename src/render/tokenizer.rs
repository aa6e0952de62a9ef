//! A small HTML tag-stream tokenizer.
//!
//! It does not build a tree: it yields text runs, start tags (with
//! attributes) and end tags in document order. Comments, doctypes and
//! processing instructions are dropped. The content of non-content
//! elements (`script`, `style`, `head`, `title`) is dropped together with
//! the element, so no later stage ever sees it.
//!
//! Text is returned raw; character references are decoded by the consumer.

/// Elements removed together with everything inside them.
const REMOVED_ELEMENTS: &[&str] = &["script", "style", "head", "title"];

/// A start tag. Names are ASCII-lowercased, attribute values are raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl Tag {
    /// Value of the first attribute called `name` (case-insensitive).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Start(Tag),
    End(String),
}

/// Iterator over the tokens of an HTML document.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Advance past the next `needle`, or to the end of input.
    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(idx) => self.pos += idx + needle.len(),
            None => self.pos = self.src.len(),
        }
    }

    /// Skip to just after `</name ...>`, matching the name case-insensitively.
    fn skip_element_content(&mut self, name: &str) {
        let bytes = self.src.as_bytes();
        let mut search = self.pos;
        while let Some(idx) = self.src[search..].find("</") {
            let name_start = search + idx + 2;
            let name_end = name_start + name.len();
            if name_end <= bytes.len()
                && bytes[name_start..name_end].eq_ignore_ascii_case(name.as_bytes())
                && bytes
                    .get(name_end)
                    .is_none_or(|b| *b == b'>' || b.is_ascii_whitespace() || *b == b'/')
            {
                self.pos = name_end;
                self.skip_past(">");
                return;
            }
            search = name_start;
        }
        self.pos = self.src.len();
    }

    /// Try to read a markup construct at `self.pos` (which is at `<`).
    ///
    /// Returns `None` when the `<` does not open a tag; the caller then
    /// treats it as literal text.
    fn read_markup(&mut self) -> Option<Option<Token<'a>>> {
        let rest = self.rest();
        let after = rest.as_bytes().get(1).copied()?;

        if rest.starts_with("<!--") {
            self.pos += 4;
            self.skip_past("-->");
            return Some(None);
        }
        if after == b'!' || after == b'?' {
            self.skip_past(">");
            return Some(None);
        }
        if after == b'/' {
            let name = read_name(&rest[2..]);
            if name.is_empty() {
                return None;
            }
            let close = 2 + rest[2..].find(['>', '<'])?;
            if rest.as_bytes()[close] != b'>' {
                return None;
            }
            self.pos += close + 1;
            return Some(Some(Token::End(name.to_ascii_lowercase())));
        }
        if !after.is_ascii_alphabetic() {
            return None;
        }

        let (tag, consumed) = parse_start_tag(&rest[1..])?;
        self.pos += 1 + consumed;

        if !tag.self_closing && REMOVED_ELEMENTS.contains(&tag.name.as_str()) {
            self.skip_element_content(&tag.name);
            return Some(None);
        }
        Some(Some(Token::Start(tag)))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            match rest.find('<') {
                Some(0) => match self.read_markup() {
                    Some(Some(token)) => return Some(token),
                    Some(None) => continue,
                    None => {
                        self.pos += 1;
                        return Some(Token::Text("<"));
                    }
                },
                Some(idx) => {
                    self.pos += idx;
                    return Some(Token::Text(&rest[..idx]));
                }
                None => {
                    self.pos = self.src.len();
                    return Some(Token::Text(rest));
                }
            }
        }
        None
    }
}

/// Leading run of tag-name characters.
fn read_name(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

/// Parse `name attr="v" ...>` (the input starts right after `<`).
///
/// Returns the tag and the number of bytes consumed including `>`, or
/// `None` if the tag is never closed. A `<` outside a quoted value ends the
/// attempt, so a failed tag never scans past the next one.
fn parse_start_tag(s: &str) -> Option<(Tag, usize)> {
    let bytes = s.as_bytes();
    let name = read_name(s);
    let mut i = name.len();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                i += 1;
                if bytes.get(i) == Some(&b'>') {
                    self_closing = true;
                }
                continue;
            }
            b'<' => return None,
            _ => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'<')
        {
            i += 1;
        }
        let key = s[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                quote @ (b'"' | b'\'') => {
                    let close = s[i + 1..].find(*quote as char)?;
                    value = s[i + 1..i + 1 + close].to_string();
                    i += close + 2;
                }
                b'<' => return None,
                _ => {
                    let start = i;
                    while i < bytes.len()
                        && !bytes[i].is_ascii_whitespace()
                        && !matches!(bytes[i], b'>' | b'<')
                    {
                        i += 1;
                    }
                    value = s[start..i].to_string();
                }
            }
        }
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    let tag = Tag {
        name: name.to_ascii_lowercase(),
        attrs,
        self_closing,
    };
    Some((tag, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(html: &str) -> Vec<Token<'_>> {
        Tokenizer::new(html).collect()
    }

    fn start(name: &str) -> Token<'static> {
        Token::Start(Tag {
            name: name.to_string(),
            attrs: Vec::new(),
            self_closing: false,
        })
    }

    #[test]
    fn test_simple_stream() {
        assert_eq!(
            tokens("<p>Hi <B>there</B></p>"),
            vec![
                start("p"),
                Token::Text("Hi "),
                start("b"),
                Token::Text("there"),
                Token::End("b".to_string()),
                Token::End("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_attributes() {
        let toks = tokens(r#"<a HREF="https://x.test/?a=1&amp;b=2" class=link data-x='y z'>t</a>"#);
        let Token::Start(tag) = &toks[0] else {
            panic!("expected start tag, got {:?}", toks[0]);
        };
        assert_eq!(tag.name, "a");
        assert_eq!(tag.attr("href"), Some("https://x.test/?a=1&amp;b=2"));
        assert_eq!(tag.attr("class"), Some("link"));
        assert_eq!(tag.attr("data-x"), Some("y z"));
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let toks = tokens(r#"<img alt="a > b" src="x.png">after"#);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1], Token::Text("after"));
    }

    #[test]
    fn test_self_closing() {
        let toks = tokens("line<br/>next<hr />");
        let Token::Start(br) = &toks[1] else {
            panic!("expected br");
        };
        assert!(br.self_closing);
        assert_eq!(br.name, "br");
        assert!(matches!(&toks[3], Token::Start(hr) if hr.name == "hr" && hr.self_closing));
    }

    #[test]
    fn test_removed_elements_vanish() {
        let toks = tokens("a<script type=\"x\">if (a < b) { x(\"</p>\") }</SCRIPT>b<style>p{}</style>c");
        assert_eq!(
            toks,
            vec![Token::Text("a"), Token::Text("b"), Token::Text("c")]
        );
    }

    #[test]
    fn test_unclosed_removed_element_drops_rest() {
        assert_eq!(tokens("keep<script>lost"), vec![Token::Text("keep")]);
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        assert_eq!(
            tokens("<!DOCTYPE html><!-- <b>no</b> -->yes"),
            vec![Token::Text("yes")]
        );
    }

    #[test]
    fn test_literal_less_than() {
        assert_eq!(
            tokens("1 < 2"),
            vec![Token::Text("1 "), Token::Text("<"), Token::Text(" 2")]
        );
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        let toks = tokens("x <b");
        assert_eq!(toks, vec![Token::Text("x "), Token::Text("<"), Token::Text("b")]);
    }

    #[test]
    fn test_unterminated_tag_stops_at_next_tag() {
        assert_eq!(
            tokens("<a href=x <b>bold</b>"),
            vec![
                Token::Text("<"),
                Token::Text("a href=x "),
                start("b"),
                Token::Text("bold"),
                Token::End("b".to_string()),
            ]
        );
        assert_eq!(
            tokens("</a </b>"),
            vec![
                Token::Text("<"),
                Token::Text("/a "),
                Token::End("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_many_unterminated_tags() {
        let input = "<a".repeat(100_000);
        let toks = tokens(&input);
        assert_eq!(toks.len(), 200_000);
        assert!(toks.iter().all(|t| matches!(t, Token::Text("<") | Token::Text("a"))));

        let closes = "</a".repeat(100_000);
        assert_eq!(tokens(&closes).len(), 200_000);
    }
}
