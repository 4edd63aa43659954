use indexmap::IndexMap;
use quizmap_common::DocumentVariant;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw statistics attached to one item on a page, as handed over by the
/// page collaborator. `payload` is the serialized JSON array of
/// `{ "id": .., "hit": .. }` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlob {
    pub item_number: Option<String>,
    pub payload: String,
}

impl StatBlob {
    pub fn new(item_number: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            item_number: Some(item_number.into()),
            payload: payload.into(),
        }
    }
}

/// One choice's vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeStat {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(deserialize_with = "lenient_hit")]
    pub hit: i64,
}

impl AlternativeStat {
    pub fn new(id: impl Into<String>, hit: i64) -> Self {
        Self { id: id.into(), hit }
    }
}

/// Parsed statistics for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub item_number: String,
    pub alternative_stats: Vec<AlternativeStat>,
}

// The page sometimes renders ids as bare numbers.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "alternative id must be a string or number, got {other}"
        ))),
    }
}

fn lenient_hit<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    let parsed = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("hit must be an integer, got {value}")))
}

/// Item number → correct alternative id for a single page.
///
/// Insertion ordered so summaries read in page order. Re-inserting a number
/// replaces the earlier answer in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(IndexMap<String, String>);

impl AnswerKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: impl Into<String>, alternative: impl Into<String>) {
        self.0.insert(number.into(), alternative.into());
    }

    pub fn get(&self, number: &str) -> Option<&str> {
        self.0.get(number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `"1:B, 2:C"`, the form the answer list is logged in.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(number, alt)| format!("{number}:{alt}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<(String, String)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut key = AnswerKey::new();
        for (number, alt) in iter {
            key.insert(number, alt);
        }
        key
    }
}

/// Markup pieces of one item, as scraped from the rendered page. Every
/// field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFragment {
    pub number: String,
    pub title: String,
    pub info_text: String,
    pub statement_html: String,
    pub alternatives_html: Vec<String>,
    pub commentary_html: Vec<String>,
    pub badge_html: String,
    pub extra_html: Vec<String>,
    /// The item's own statistics payload, used when the page key has no
    /// answer for this number.
    pub embedded_stats: Option<String>,
}

/// Everything the collaborator captured from one page visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDump {
    pub url: Option<String>,
    pub stats: Vec<StatBlob>,
    pub fragments: Vec<RawFragment>,
}

impl PageDump {
    /// Short name for logs.
    pub fn label(&self) -> &str {
        self.url.as_deref().unwrap_or("<unnamed page>")
    }
}

/// One extracted item, ready to be placed in the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Resolved alternative id, possibly empty. Sort key of the document.
    pub answer_key: String,
    /// Plain-text header, unescaped.
    pub label: String,
    pub highlighted: bool,
    /// Rich-content blocks and child nodes of the record's node.
    pub body_markup: String,
}

/// A finished map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub variant: DocumentVariant,
    pub node_count: usize,
    content: String,
}

impl Document {
    pub(crate) fn new(variant: DocumentVariant, node_count: usize, content: String) -> Self {
        Self {
            variant,
            node_count,
            content,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_string(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}
