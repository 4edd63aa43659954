//! Freeplane map serialization.
//!
//! The builder is a one-shot function of the collected records: it orders
//! them by answer, wraps each in a node element and emits the map. The
//! record bodies are embedded unchanged, so all record-specific markup
//! decisions stay in the extractor.

use chrono::Utc;
use quizmap_common::{DocumentVariant, QuizmapError, RenderOptions, Result};
use uuid::Uuid;

use crate::markup::{self, CLOSE_NODE, NODE_MAX_WIDTH};
use crate::types::{Document, Record};

pub const LEGACY_MAP_VERSION: &str = "freeplane 1.9.8";
pub const TEMPLATED_MAP_VERSION: &str = "freeplane 1.9.13";

/// Branch colors, picked by output position.
pub const PALETTE: [&str; 6] = [
    "#ff0000", "#0000ff", "#00ff00", "#ff00ff", "#00ffff", "#7c0000",
];

pub fn accent_color(position: usize) -> &'static str {
    PALETTE[position % PALETTE.len()]
}

#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    variant: DocumentVariant,
    root_label: String,
    timestamp_ms: Option<i64>,
}

impl DocumentBuilder {
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            variant: options.document_variant,
            root_label: options.root_label.clone(),
            timestamp_ms: None,
        }
    }

    pub fn variant(&self) -> DocumentVariant {
        self.variant
    }

    /// Pin `CREATED`/`MODIFIED` instead of reading the clock.
    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp_ms = Some(millis);
        self
    }

    /// Serialize `records` into one map, ordered by answer key.
    ///
    /// Fails only when a record's body does not close what it opens; such a
    /// record cannot come out of the extractor, so it is reported rather
    /// than skipped.
    pub fn build(&self, records: &[Record]) -> Result<Document> {
        for (index, record) in records.iter().enumerate() {
            let unbalanced = markup::unbalanced_containers(&record.body_markup);
            if !unbalanced.is_empty() {
                return Err(QuizmapError::MalformedRecord {
                    index,
                    reason: format!("unbalanced {} elements", unbalanced.join(", ")),
                });
            }
        }

        let sorted = sort_by_answer(records);
        let content = match self.variant {
            DocumentVariant::Legacy => legacy_map(&sorted),
            DocumentVariant::ModernTemplated => self.templated_map(&sorted),
        };

        tracing::info!(
            variant = self.variant.as_str(),
            nodes = sorted.len(),
            bytes = content.len(),
            "document built"
        );
        Ok(Document::new(self.variant, sorted.len(), content))
    }

    fn templated_map(&self, sorted: &[&Record]) -> String {
        let stamp = self
            .timestamp_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis())
            .to_string();

        let mut out = String::with_capacity(
            TEMPLATE_STYLES.len() + sorted.iter().map(|r| r.body_markup.len() + 160).sum::<usize>(),
        );
        out.push_str(&format!("<map version=\"{TEMPLATED_MAP_VERSION}\">\n"));
        out.push_str(
            "<!--To view this file, download free mind mapping software Freeplane from https://www.freeplane.org -->\n",
        );
        let root_id = node_id();
        out.push_str(&markup::open_node(&[
            ("TEXT", &self.root_label),
            ("FOLDED", "false"),
            ("ID", &root_id),
            ("CREATED", &stamp),
            ("MODIFIED", &stamp),
            ("STYLE", "oval"),
        ]));
        out.push('\n');
        out.push_str(TEMPLATE_STYLES);
        out.push_str(&format!(
            "<hook NAME=\"AutomaticEdgeColor\" COUNTER=\"{}\" RULE=\"ON_BRANCH_CREATION\"/>\n",
            sorted.len()
        ));

        for (position, record) in sorted.iter().enumerate() {
            let id = node_id();
            out.push_str(&markup::open_node(&[
                ("TEXT", &record.label),
                ("POSITION", "right"),
                ("ID", &id),
                ("CREATED", &stamp),
                ("MODIFIED", &stamp),
                ("MAX_WIDTH", NODE_MAX_WIDTH),
            ]));
            out.push_str(&format!(
                "\n<edge COLOR=\"{}\"/>\n",
                markup::escape_attr(accent_color(position))
            ));
            out.push_str(&record.body_markup);
            out.push('\n');
            out.push_str(CLOSE_NODE);
            out.push('\n');
        }

        out.push_str(CLOSE_NODE);
        out.push_str("\n</map>\n");
        out
    }
}

/// Stable, byte-wise ordering by answer key.
pub fn sort_by_answer(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| a.answer_key.cmp(&b.answer_key));
    sorted
}

fn legacy_map(sorted: &[&Record]) -> String {
    let mut out = format!(
        "<map version=\"{LEGACY_MAP_VERSION}\">{}",
        markup::open_node(&[("LOCALIZED_TEXT", "new_mindmap")])
    );
    for record in sorted {
        out.push_str(&markup::open_node(&[("MAX_WIDTH", NODE_MAX_WIDTH)]));
        out.push_str(&record.body_markup);
        out.push_str(CLOSE_NODE);
    }
    out.push_str(CLOSE_NODE);
    out.push_str("</map>");
    out
}

fn node_id() -> String {
    format!("ID_{}", Uuid::new_v4().simple())
}

const TEMPLATE_STYLES: &str = r##"<font NAME="SansSerif" SIZE="18" BOLD="true"/>
<hook NAME="MapStyle">
<properties edgeColorConfiguration="#808080ff,#ff0000ff,#0000ffff,#00ff00ff,#ff00ffff,#00ffffff,#7c0000ff" fit_to_viewport="false" show_note_icons="true"/>
<map_styles>
<stylenode LOCALIZED_TEXT="styles.root_node" STYLE="oval" UNIFORM_SHAPE="true" VGAP_QUANTITY="24 pt">
<font SIZE="24"/>
<stylenode LOCALIZED_TEXT="styles.predefined" POSITION="bottom_or_right" STYLE="bubble">
<stylenode LOCALIZED_TEXT="default" ICON_SIZE="12 pt" COLOR="#000000" STYLE="fork">
<font NAME="SansSerif" SIZE="10" BOLD="false" ITALIC="false"/>
</stylenode>
<stylenode LOCALIZED_TEXT="defaultstyle.details"/>
<stylenode LOCALIZED_TEXT="defaultstyle.attributes">
<font SIZE="9"/>
</stylenode>
<stylenode LOCALIZED_TEXT="defaultstyle.note" COLOR="#000000" BACKGROUND_COLOR="#ffffff" TEXT_ALIGN="LEFT"/>
<stylenode LOCALIZED_TEXT="defaultstyle.floating">
<edge STYLE="hide_edge"/>
</stylenode>
</stylenode>
<stylenode LOCALIZED_TEXT="styles.AutomaticLayout" POSITION="bottom_or_right" STYLE="bubble">
<stylenode LOCALIZED_TEXT="AutomaticLayout.level.root" COLOR="#000000" STYLE="oval">
<font SIZE="18"/>
</stylenode>
<stylenode LOCALIZED_TEXT="AutomaticLayout.level,1" COLOR="#0033ff">
<font SIZE="16"/>
</stylenode>
<stylenode LOCALIZED_TEXT="AutomaticLayout.level,2" COLOR="#00b439">
<font SIZE="14"/>
</stylenode>
</stylenode>
</stylenode>
</map_styles>
</hook>
"##;
