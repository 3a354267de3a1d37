// src/normalize.rs
//! Shared text cleanup for feed titles and article bodies.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize text pulled out of a feed: strip tags, decode HTML entities
/// (named and numeric), collapse whitespace, trim. Tags go first so a
/// literal `&lt;` in prose decodes to `<` without being eaten as markup.
pub fn normalize_text(s: &str) -> String {
    // 1) Strip HTML/XML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let mut out = re_tags.replace_all(s, "").to_string();

    // 2) HTML entity decode (&amp; &#39; &#x2019; ...)
    out = html_escape::decode_html_entities(&out).to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Char-boundary-safe prefix, used to keep prompts bounded.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(normalize_text("Ben &amp; Jerry&#39;s"), "Ben & Jerry's");
        assert_eq!(normalize_text("a&lt;b&gt;c &quot;d&quot;"), "a<b>c \"d\"");
        assert_eq!(normalize_text("caf&#xE9;"), "café");
    }

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let s = "  <p>Hello <b>world</b></p>\n\n<br/>  again ";
        assert_eq!(normalize_text(s), "Hello world again");
    }

    #[test]
    fn nbsp_becomes_plain_space() {
        assert_eq!(normalize_text("one&nbsp;&nbsp;two"), "one two");
    }

    #[test]
    fn literal_entities_in_prose_survive() {
        // "&lt;" must decode to text, not become markup that swallows words
        assert_eq!(
            normalize_text("5 &lt; 10 and 20 &gt; 15 ways to save"),
            "5 < 10 and 20 > 15 ways to save"
        );
        assert_eq!(
            normalize_text("<p>x &lt; y</p> holds"),
            "x < y holds"
        );
    }

    #[test]
    fn is_idempotent() {
        let raw = "<h1>OpenAI &amp; friends</h1>\t launch";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn truncate_respects_multibyte_chars() {
        let s = "日本語のテキスト";
        assert_eq!(truncate_chars(s, 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
