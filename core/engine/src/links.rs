//! FILENAME: core/engine/src/links.rs
//! PURPOSE: Markdown-style `[text](url)` links inside table cell values.

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*)\]\((.*)\)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub url: String,
}

/// Finds a `[text](url)` link in `value`. The match is greedy, so a value
/// holding several links yields one spanning all of them.
pub fn detect_link(value: &str) -> Option<Link> {
    let caps = LINK_RE.captures(value)?;
    Some(Link {
        text: caps[1].to_string(),
        url: encode_uri(&caps[2]),
    })
}

/// Percent-encodes everything except URI reserved and unreserved characters.
pub fn encode_uri(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    for c in uri.chars() {
        if c.is_ascii_alphanumeric() || "-_.!~*'();/?:@&=+$,#".contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_link() {
        let link = detect_link("see [the docs](https://example.com/a b)").unwrap();
        assert_eq!(link.text, "the docs");
        assert_eq!(link.url, "https://example.com/a%20b");
    }

    #[test]
    fn test_plain_text_has_no_link() {
        assert_eq!(detect_link("just text"), None);
        assert_eq!(detect_link(""), None);
        assert_eq!(detect_link("[half]"), None);
    }

    #[test]
    fn test_encode_uri_keeps_reserved() {
        assert_eq!(encode_uri("https://x.io/p?q=1&r=2#top"), "https://x.io/p?q=1&r=2#top");
        assert_eq!(encode_uri("/caf\u{e9}"), "/caf%C3%A9");
        assert_eq!(encode_uri("100%"), "100%25");
    }
}
