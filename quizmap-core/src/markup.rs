//! Markup templating for Freeplane nodes.
//!
//! Two kinds of text end up in the map. Plain text placed in an XML
//! attribute (node labels, ids, colors) always goes through [`escape_attr`].
//! HTML captured from the page is already serialized markup and is embedded
//! inside `<richcontent>` blocks unchanged. Keep those two paths separate:
//! escaping page HTML would show tags as text, and not escaping labels would
//! break the map.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Opening tag of the commentary container as the page renders it.
pub const COMMENTARY_OPENER: &str = r#"<div class="question-commentary-text font-size-2">"#;
/// Visual break inserted after the first commentary opener of a note.
pub const COMMENTARY_SEPARATOR: &str = "<p>------------</p>";
/// Extra-text container with the dotted class list some page builds emit.
pub const EXTRA_QUIRK_OPENER: &str = r#"<div class="text px-3.font-size-2 svelte-1tiqrp1">"#;
/// The same container with its class list split properly.
pub const EXTRA_OPENER: &str = r#"<div class="text px-3 font-size-2 svelte-1tiqrp1">"#;
pub const BULLET: &str = "♦ ";
pub const NODE_MAX_WIDTH: &str = "40 cm";
pub const HEADER_SEPARATOR: &str = " | ";

/// Escape `&`, `<`, `>` and `"` for use inside a double-quoted attribute.
///
/// Tabs and line breaks become character references so attribute-value
/// normalization keeps them; other control characters are not allowed in
/// XML 1.0 and are dropped.
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| matches!(c, '&' | '<' | '>' | '"') || c.is_control()) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c if c.is_control() => {}
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Insert `insertion` right after the first occurrence of `marker`.
pub fn insert_after_first(haystack: &str, marker: &str, insertion: &str) -> String {
    match haystack.find(marker) {
        Some(pos) => {
            let split = pos + marker.len();
            let mut out = String::with_capacity(haystack.len() + insertion.len());
            out.push_str(&haystack[..split]);
            out.push_str(insertion);
            out.push_str(&haystack[split..]);
            out
        }
        None => haystack.to_string(),
    }
}

/// Attribute list rendered in the given order. Values are escaped here and
/// nowhere else.
pub fn attributes(attrs: &[(&str, &str)]) -> String {
    attrs
        .iter()
        .map(|(name, value)| format!(" {name}=\"{}\"", escape_attr(value)))
        .collect()
}

pub fn open_node(attrs: &[(&str, &str)]) -> String {
    format!("<node{}>", attributes(attrs))
}

pub const CLOSE_NODE: &str = "</node>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RichKind {
    Node,
    Note,
}

/// Wrap raw HTML in a Freeplane rich-content block.
pub fn rich_content(kind: RichKind, html: &str) -> String {
    let open = match kind {
        RichKind::Node => r#"<richcontent TYPE="NODE">"#,
        RichKind::Note => r#"<richcontent TYPE="NOTE" CONTENT-TYPE="xml/">"#,
    };
    format!("{open}<html><head></head><body>{html}</body></html></richcontent>")
}

/// Opening and closing counts of an element in a markup string.
pub fn tag_balance(markup: &str, name: &str) -> (usize, usize) {
    let open_prefix = format!("<{name}");
    let close = format!("</{name}>");
    let opens = markup
        .match_indices(&open_prefix)
        .filter(|(pos, m)| {
            matches!(
                markup[pos + m.len()..].chars().next(),
                Some(' ' | '>' | '\t' | '\n' | '\r')
            )
        })
        .count();
    let closes = markup.matches(&close).count();
    (opens, closes)
}

/// Elements whose stray open or close tag would break the map structure.
pub const CONTAINERS: [&str; 6] = ["map", "node", "richcontent", "html", "head", "body"];

/// Names of the container elements whose open/close counts differ.
pub fn unbalanced_containers(markup: &str) -> Vec<&'static str> {
    CONTAINERS
        .into_iter()
        .filter(|name| {
            let (opens, closes) = tag_balance(markup, name);
            opens != closes
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_label_characters() {
        assert_eq!(
            escape_attr(r#"<script>"a" & b</script>"#),
            "&lt;script&gt;&quot;a&quot; &amp; b&lt;/script&gt;"
        );
        assert!(matches!(escape_attr("plain text"), Cow::Borrowed(_)));
        assert_eq!(escape_attr("l'apostrophe"), "l'apostrophe");
    }

    #[test]
    fn attribute_whitespace_survives_and_controls_are_dropped() {
        assert_eq!(
            escape_attr("Direito\nPenal\tI\r"),
            "Direito&#10;Penal&#9;I&#13;"
        );
        assert_eq!(escape_attr("a\u{0}b\u{1b}c"), "abc");
        assert_eq!(
            open_node(&[("TEXT", "1 | E\nTítulo")]),
            r#"<node TEXT="1 | E&#10;Título">"#
        );
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            collapse_whitespace("  Banca:\n  FCC \t Órgão:  TRT  "),
            "Banca: FCC Órgão: TRT"
        );
    }

    #[test]
    fn inserts_only_after_first_marker() {
        let html = format!("{COMMENTARY_OPENER}a</div>{COMMENTARY_OPENER}b</div>");
        let out = insert_after_first(&html, COMMENTARY_OPENER, COMMENTARY_SEPARATOR);
        assert_eq!(out.matches(COMMENTARY_SEPARATOR).count(), 1);
        assert!(out.starts_with(&format!("{COMMENTARY_OPENER}{COMMENTARY_SEPARATOR}a")));
        assert_eq!(insert_after_first("none", "x", "y"), "none");
    }

    #[test]
    fn attributes_are_escaped_in_order() {
        assert_eq!(
            open_node(&[("TEXT", "a < b"), ("MAX_WIDTH", NODE_MAX_WIDTH)]),
            r#"<node TEXT="a &lt; b" MAX_WIDTH="40 cm">"#
        );
        assert_eq!(open_node(&[]), "<node>");
    }

    #[test]
    fn rich_content_shapes() {
        assert_eq!(
            rich_content(RichKind::Node, "<b>x</b>"),
            r#"<richcontent TYPE="NODE"><html><head></head><body><b>x</b></body></html></richcontent>"#
        );
        assert!(rich_content(RichKind::Note, "").contains(r#"CONTENT-TYPE="xml/""#));
    }

    #[test]
    fn balance_ignores_similar_tag_names() {
        let markup = "<node><nodes></nodes><richcontent TYPE=\"NODE\"></richcontent></node>";
        assert_eq!(tag_balance(markup, "node"), (1, 1));
        assert!(unbalanced_containers(markup).is_empty());
        assert_eq!(unbalanced_containers("<node></node></node>"), vec!["node"]);
        assert_eq!(unbalanced_containers("<richcontent TYPE=\"NOTE\">"), vec!["richcontent"]);
    }

    #[test]
    fn envelope_closers_are_unbalanced() {
        assert_eq!(
            unbalanced_containers("<p>a</p></body></html></map>"),
            vec!["map", "html", "body"]
        );
        assert!(unbalanced_containers(&rich_content(RichKind::Note, "<header>x</header>")).is_empty());
        assert_eq!(unbalanced_containers("<head>"), vec!["head"]);
    }
}
