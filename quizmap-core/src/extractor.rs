//! Turns one item's scraped fragments into a map record.

use quizmap_common::RenderOptions;
use rayon::prelude::*;

use crate::answer::{AnswerChain, EmbeddedStats, KeyLookup, Supplied};
use crate::markup::{self, RichKind};
use crate::resolver::{self, normalize_number};
use crate::types::{AnswerKey, PageDump, RawFragment, Record};

/// Answer id the site uses for items the account got wrong.
pub const WRONG_ANSWER_MARKER: &str = "E";

/// Records extracted from one page, in fragment order.
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub answer_key: AnswerKey,
    pub records: Vec<Record>,
    pub discarded: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: RenderOptions,
}

impl Extractor {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Extract one item. A non-empty `resolved_answer` wins; otherwise the
    /// fragment's embedded statistics are consulted. Returns `None` when the
    /// item has nothing to show.
    pub fn extract(&self, fragment: &RawFragment, resolved_answer: &str) -> Option<Record> {
        let chain = AnswerChain::new()
            .then(Supplied(resolved_answer))
            .then(EmbeddedStats);
        self.extract_with(fragment, &chain)
    }

    /// Extract one item with a caller-provided answer chain.
    pub fn extract_with(&self, fragment: &RawFragment, answers: &AnswerChain<'_>) -> Option<Record> {
        let number = normalize_number(&fragment.number);
        let answer = answers.resolve(fragment);
        let title = fragment.title.trim();
        let info = strip_title(&markup::collapse_whitespace(&fragment.info_text), title);
        let statement = fragment.statement_html.trim().replace('\n', " ");

        let header = [number.as_str(), answer.as_str(), title, info.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(markup::HEADER_SEPARATOR);

        if header.trim().is_empty() && statement.trim().is_empty() {
            tracing::debug!(item = %number, "discarding empty item");
            return None;
        }

        let highlighted =
            answer == WRONG_ANSWER_MARKER && self.options.highlight_wrong_answers;
        let style = if highlighted {
            format!(
                " style=\"background-color: {};\"",
                markup::escape_attr(self.options.highlight_color.trim())
            )
        } else {
            String::new()
        };
        let content = format!("<span{style}>{header}</span><br>{statement}");

        let mut body = markup::rich_content(RichKind::Node, &content);
        body.push_str(&markup::rich_content(RichKind::Note, &note_html(fragment)));
        if let Some(extra) = extra_child(&fragment.extra_html) {
            body.push_str(&extra);
        }
        if let Some(commentary) = commentary_child(&fragment.commentary_html) {
            body.push_str(&commentary);
        }

        let unbalanced = markup::unbalanced_containers(&body);
        if !unbalanced.is_empty() {
            tracing::warn!(
                item = %number,
                containers = ?unbalanced,
                "discarding item whose markup would break the map"
            );
            return None;
        }

        tracing::debug!(item = %number, answer = %answer, highlighted, "item extracted");
        Some(Record {
            answer_key: answer,
            label: header,
            highlighted,
            body_markup: body,
        })
    }

    /// Resolve the page key and extract every fragment against it.
    ///
    /// Fragments are independent, so they are extracted in parallel; the
    /// result keeps fragment order.
    pub fn extract_page(&self, page: &PageDump) -> PageExtraction {
        let answer_key = resolver::resolve(&page.stats);
        let chain = AnswerChain::new()
            .then(KeyLookup(&answer_key))
            .then(EmbeddedStats);

        let extracted: Vec<Option<Record>> = page
            .fragments
            .par_iter()
            .map(|fragment| self.extract_with(fragment, &chain))
            .collect();
        drop(chain);

        let total = extracted.len();
        let records: Vec<Record> = extracted.into_iter().flatten().collect();
        let discarded = total - records.len();

        tracing::info!(
            page = page.label(),
            answers = answer_key.len(),
            records = records.len(),
            discarded,
            "page extracted"
        );

        PageExtraction {
            answer_key,
            records,
            discarded,
        }
    }
}

/// Drop the first verbatim copy of `title` from the info line.
fn strip_title(info: &str, title: &str) -> String {
    if info.contains(title) {
        info.replacen(title, "", 1).trim().to_string()
    } else {
        info.to_string()
    }
}

/// Commentary fragments, then alternatives, then the badge.
fn note_html(fragment: &RawFragment) -> String {
    let commentary = fragment
        .commentary_html
        .iter()
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let alternatives = fragment
        .alternatives_html
        .iter()
        .map(|a| a.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let section = markup::insert_after_first(
        &format!("{commentary}{alternatives}"),
        markup::COMMENTARY_OPENER,
        markup::COMMENTARY_SEPARATOR,
    );
    format!(
        "{section}{}{}",
        markup::HEADER_SEPARATOR,
        fragment.badge_html.trim()
    )
}

fn extra_child(extra_html: &[String]) -> Option<String> {
    let bulleted = format!("{}{}", markup::EXTRA_OPENER, markup::BULLET);
    let joined: String = extra_html
        .iter()
        .map(|e| e.replacen(markup::EXTRA_QUIRK_OPENER, &bulleted, 1))
        .collect();
    if joined.is_empty() {
        return None;
    }
    Some(format!(
        "{}{}{}",
        markup::open_node(&[]),
        markup::rich_content(RichKind::Node, &joined),
        markup::CLOSE_NODE
    ))
}

// Repeats the first commentary as its own child even though the note
// already carries it.
fn commentary_child(commentary_html: &[String]) -> Option<String> {
    let first = commentary_html
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())?;
    Some(format!(
        "{}{}{}",
        markup::open_node(&[("MAX_WIDTH", markup::NODE_MAX_WIDTH)]),
        markup::rich_content(RichKind::Node, first),
        markup::CLOSE_NODE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatBlob;

    fn extractor() -> Extractor {
        Extractor::new(RenderOptions::default())
    }

    fn direito() -> RawFragment {
        RawFragment {
            number: "5".into(),
            title: "Direito".into(),
            info_text: "Direito Constitucional".into(),
            statement_html: "<p>Julgue o item.</p>".into(),
            ..RawFragment::default()
        }
    }

    #[test]
    fn all_empty_fragment_is_discarded() {
        assert!(extractor().extract(&RawFragment::default(), "").is_none());
    }

    #[test]
    fn whitespace_only_fragment_is_discarded() {
        let fragment = RawFragment {
            number: " \n ".into(),
            info_text: "\t".into(),
            statement_html: "\n  \n".into(),
            badge_html: "<span class=\"badge\">x</span>".into(),
            ..RawFragment::default()
        };
        assert!(extractor().extract(&fragment, "").is_none());
    }

    #[test]
    fn header_strips_title_from_info_and_highlights_wrong_answer() {
        let record = extractor().extract(&direito(), "E").unwrap();
        assert_eq!(record.label, "5 | E | Direito | Constitucional");
        assert!(record.highlighted);
        assert!(record.body_markup.contains("#ffcccc"));
        assert!(record.body_markup.contains(
            "<span style=\"background-color: #ffcccc;\">5 | E | Direito | Constitucional</span><br><p>Julgue o item.</p>"
        ));
    }

    #[test]
    fn highlight_can_be_disabled() {
        let options = RenderOptions {
            highlight_wrong_answers: false,
            ..RenderOptions::default()
        };
        let record = Extractor::new(options).extract(&direito(), "E").unwrap();
        assert!(!record.highlighted);
        assert!(!record.body_markup.contains("background-color"));
        assert!(record.body_markup.contains("<span>5 | E | Direito | Constitucional</span>"));
    }

    #[test]
    fn only_the_marker_answer_is_highlighted() {
        let record = extractor().extract(&direito(), "C").unwrap();
        assert!(!record.highlighted);
        assert_eq!(record.answer_key, "C");
    }

    #[test]
    fn custom_highlight_color_is_used() {
        let options = RenderOptions {
            highlight_color: "#ffe0e0".into(),
            ..RenderOptions::default()
        };
        let record = Extractor::new(options).extract(&direito(), "E").unwrap();
        assert!(record.body_markup.contains("background-color: #ffe0e0;"));
    }

    #[test]
    fn embedded_stats_answer_when_none_supplied() {
        let fragment = RawFragment {
            embedded_stats: Some(r#"[{"id":"A","hit":0},{"id":"D","hit":1}]"#.into()),
            ..direito()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        assert_eq!(record.answer_key, "D");
        assert_eq!(record.label, "5 | D | Direito | Constitucional");

        let record = extractor().extract(&fragment, "B").unwrap();
        assert_eq!(record.answer_key, "B");
    }

    #[test]
    fn info_whitespace_is_collapsed() {
        let fragment = RawFragment {
            number: "1".into(),
            title: "Português".into(),
            info_text: "  Ano: 2023\n\n   Banca:   FCC  ".into(),
            ..RawFragment::default()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        assert_eq!(record.label, "1 | Português | Ano: 2023 Banca: FCC");
    }

    #[test]
    fn statement_newlines_become_spaces() {
        let fragment = RawFragment {
            statement_html: "\n<p>linha 1</p>\n<p>linha 2</p>\n".into(),
            ..RawFragment::default()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        assert!(record
            .body_markup
            .contains("<span></span><br><p>linha 1</p> <p>linha 2</p>"));
    }

    #[test]
    fn note_has_commentary_then_alternatives_then_badge() {
        let opener = markup::COMMENTARY_OPENER;
        let fragment = RawFragment {
            commentary_html: vec![
                format!("{opener}primeiro</div>"),
                format!("{opener}segundo</div>"),
            ],
            alternatives_html: vec!["<label>A) sim</label>".into(), "<label>B) não</label>".into()],
            badge_html: "<span class=\"badge\">Anulada</span>".into(),
            ..direito()
        };
        let record = extractor().extract(&fragment, "A").unwrap();
        let expected_note = format!(
            "{opener}<p>------------</p>primeiro</div> {opener}segundo</div><label>A) sim</label> <label>B) não</label> | <span class=\"badge\">Anulada</span>"
        );
        assert!(record.body_markup.contains(&markup::rich_content(RichKind::Note, &expected_note)));
        assert_eq!(record.body_markup.matches("------------").count(), 1);
    }

    #[test]
    fn note_without_commentary_still_has_badge_separator() {
        let record = extractor().extract(&direito(), "").unwrap();
        assert!(record.body_markup.contains(&markup::rich_content(RichKind::Note, " | ")));
    }

    #[test]
    fn extra_fragments_become_one_bulleted_child() {
        let fragment = RawFragment {
            extra_html: vec![
                format!("{}Gabarito comentado</div>", markup::EXTRA_QUIRK_OPENER),
                "<div class=\"text\">outro</div>".into(),
            ],
            ..direito()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        let expected_child = format!(
            "<node>{}</node>",
            markup::rich_content(
                RichKind::Node,
                &format!(
                    "{}♦ Gabarito comentado</div><div class=\"text\">outro</div>",
                    markup::EXTRA_OPENER
                )
            )
        );
        assert!(record.body_markup.contains(&expected_child));
        assert!(!record.body_markup.contains(markup::EXTRA_QUIRK_OPENER));
    }

    #[test]
    fn first_commentary_is_duplicated_as_last_child() {
        let first = format!("{}texto</div>", markup::COMMENTARY_OPENER);
        let fragment = RawFragment {
            commentary_html: vec!["  ".into(), first.clone(), "<div>segundo</div>".into()],
            extra_html: vec!["<div>extra</div>".into()],
            ..direito()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        let dup = format!(
            "<node MAX_WIDTH=\"40 cm\">{}</node>",
            markup::rich_content(RichKind::Node, &first)
        );
        assert!(record.body_markup.ends_with(&dup));
        let extra_at = record.body_markup.find("<node>").unwrap();
        let dup_at = record.body_markup.find(&dup).unwrap();
        assert!(extra_at < dup_at);
    }

    #[test]
    fn no_children_without_extra_or_commentary() {
        let record = extractor().extract(&direito(), "").unwrap();
        assert!(!record.body_markup.contains("<node"));
        assert!(record.body_markup.starts_with("<richcontent TYPE=\"NODE\">"));
    }

    #[test]
    fn html_passes_through_unescaped() {
        let fragment = RawFragment {
            title: "<script>".into(),
            ..RawFragment::default()
        };
        let record = extractor().extract(&fragment, "").unwrap();
        assert_eq!(record.label, "<script>");
        assert!(record.body_markup.contains("<span><script></span>"));
    }

    #[test]
    fn markup_that_would_break_nesting_is_discarded() {
        let fragment = RawFragment {
            statement_html: "<p>fim</p></richcontent></node>".into(),
            ..direito()
        };
        assert!(extractor().extract(&fragment, "").is_none());
    }

    #[test]
    fn markup_that_would_close_the_map_is_discarded() {
        let statement = RawFragment {
            statement_html: "<p>a</p></body></html></map>".into(),
            ..direito()
        };
        assert!(extractor().extract(&statement, "").is_none());

        let badge = RawFragment {
            badge_html: "</body></html></richcontent></node></node></map><map>".into(),
            ..direito()
        };
        assert!(extractor().extract(&badge, "").is_none());
    }

    #[test]
    fn page_extraction_uses_key_then_embedded_stats() {
        let page = PageDump {
            url: Some("https://example.test/p1".into()),
            stats: vec![
                StatBlob::new("1", r#"[{"id":"A","hit":0},{"id":"B","hit":2}]"#),
                StatBlob::new("2", "oops"),
            ],
            fragments: vec![
                RawFragment {
                    number: "1".into(),
                    title: "T1".into(),
                    ..RawFragment::default()
                },
                RawFragment::default(),
                RawFragment {
                    number: "2".into(),
                    title: "T2".into(),
                    embedded_stats: Some(r#"[{"id":"E","hit":1}]"#.into()),
                    ..RawFragment::default()
                },
                RawFragment {
                    number: "3".into(),
                    title: "T3".into(),
                    ..RawFragment::default()
                },
            ],
        };
        let extraction = extractor().extract_page(&page);
        assert_eq!(extraction.answer_key.summary(), "1:B");
        assert_eq!(extraction.discarded, 1);
        let labels: Vec<&str> = extraction.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["1 | B | T1", "2 | E | T2", "3 | T3"]);
        assert!(extraction.records[1].highlighted);
    }
}
