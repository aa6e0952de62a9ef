//! HTML character reference decoding.

/// Decode named and numeric character references into literal characters.
///
/// Recognized names: `nbsp amp lt gt quot apos hellip mdash ndash`.
/// Numeric forms `&#NNN;` and `&#xHH;` are decoded when they denote a valid
/// scalar value. Anything unrecognized is kept verbatim.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // Longest reference we understand is well under 12 bytes.
        let decoded = rest[1..]
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| {
                decode_reference(&rest[1..1 + semi]).map(|ch| (ch, semi + 2))
            });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode the text between `&` and `;`.
fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return match code {
            // Non-breaking space renders as a plain space in chat.
            160 => Some(' '),
            _ => char::from_u32(code),
        };
    }

    let ch = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_references() {
        assert_eq!(decode_entities("A &amp; B &mdash; C"), "A & B — C");
        assert_eq!(decode_entities("&lt;tag&gt; &quot;q&quot; it&apos;s"), "<tag> \"q\" it's");
        assert_eq!(decode_entities("wait&hellip; 1&ndash;2&nbsp;x"), "wait… 1–2 x");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_entities("it&#39;s"), "it's");
        assert_eq!(decode_entities("&#x41;&#X42;&#67;"), "ABC");
        assert_eq!(decode_entities("a&#160;b"), "a b");
    }

    #[test]
    fn test_unknown_and_malformed_kept() {
        assert_eq!(decode_entities("&copy; &bogus"), "&copy; &bogus");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_double_encoded_decodes_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_multibyte_neighbours() {
        assert_eq!(decode_entities("café &amp; thé"), "café & thé");
    }
}
