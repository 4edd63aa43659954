//! Common types and utilities shared across quizmap crates.
//!
//! This crate defines the render options, the document variant switch,
//! observability helpers, and the shared error type used throughout the
//! quizmap workspace. It stays dependency-light so that the pure pipeline
//! crate can depend on it without pulling in the CLI stack.
//!
//! # Overview
//!
//! - [`RenderOptions`]: Values the pipeline consumes when composing nodes
//!   and documents
//! - [`DocumentVariant`]: Legacy bare map vs. the templated Freeplane map
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`QuizmapError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use quizmap_common::{DocumentVariant, RenderOptions};
//!
//! let mut opts = RenderOptions::default();
//! opts.document_variant = DocumentVariant::ModernTemplated;
//! assert!(opts.highlight_wrong_answers);
//! assert_eq!(opts.highlight_color, "#ffcccc");
//! assert!(opts.validate().is_ok());
//! ```
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub mod observability;

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#[0-9A-Fa-f]{3}|#[0-9A-Fa-f]{4}|#[0-9A-Fa-f]{6}|#[0-9A-Fa-f]{8}|[A-Za-z]{3,20})$")
        .unwrap()
});

/// Shape of the serialized mind map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentVariant {
    /// Bare `<map>` with a localized root and the records as plain children.
    #[default]
    Legacy,
    /// Full Freeplane template: ids, timestamps, styles and per-branch colors.
    ModernTemplated,
}

impl DocumentVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentVariant::Legacy => "legacy",
            DocumentVariant::ModernTemplated => "modern-templated",
        }
    }
}

impl std::str::FromStr for DocumentVariant {
    type Err = QuizmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(DocumentVariant::Legacy),
            "modern-templated" | "modern" | "templated" => Ok(DocumentVariant::ModernTemplated),
            other => Err(QuizmapError::Config(format!(
                "unknown document variant `{other}` (expected `legacy` or `modern-templated`)"
            ))),
        }
    }
}

/// Rendering switches consumed by the extractor and the document builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Paint the header of items whose answer is the `"E"` marker.
    #[serde(deserialize_with = "bool_or_text")]
    pub highlight_wrong_answers: bool,
    /// CSS color used for the highlight background.
    pub highlight_color: String,
    /// Which map layout the builder emits.
    pub document_variant: DocumentVariant,
    /// Root node label for the templated variant.
    pub root_label: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            highlight_wrong_answers: true,
            highlight_color: "#ffcccc".to_string(),
            document_variant: DocumentVariant::Legacy,
            root_label: "new_mindmap".to_string(),
        }
    }
}

impl RenderOptions {
    /// Reject colors that cannot be placed inside a `style` attribute as-is.
    pub fn validate(&self) -> Result<()> {
        if !COLOR_RE.is_match(self.highlight_color.trim()) {
            return Err(QuizmapError::Config(format!(
                "invalid highlight color `{}`",
                self.highlight_color
            )));
        }
        Ok(())
    }
}

/// Deserialize a flag given either as a boolean or as text.
///
/// Environment overrides reach the config as strings, so
/// `QUIZMAP__RENDER__HIGHLIGHT_WRONG_ANSWERS=false` arrives as `"false"`.
pub fn bool_or_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(d)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(D::Error::custom(format!("expected a boolean, got `{other}`"))),
        },
    }
}

/// Error types used across the quizmap workspace.
#[derive(thiserror::Error, Debug)]
pub enum QuizmapError {
    /// A record handed to the document builder breaks the markup contract.
    #[error("Malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A page dump could not be decoded.
    #[error("Invalid input {}: {reason}", .path.display())]
    Input { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`QuizmapError`].
pub type Result<T> = std::result::Result<T, QuizmapError>;
