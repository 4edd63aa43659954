//! Question-bank pages to Freeplane mind maps.
//!
//! A run collects page dumps (statistics blobs plus scraped item fragments),
//! resolves each page's answer key, turns every item into a [`Record`] and
//! finally serializes all records into one map document.
//!
//! - [`resolver`]: answer key from per-alternative statistics
//! - [`answer`]: ordered answer strategies for a single item
//! - [`extractor`]: fragment to record
//! - [`harvest`]: record accumulation across pages of a run
//! - [`document`]: sorted Freeplane serialization
//! - [`markup`]: escaping and rich-content templating
//!
//! # Examples
//!
//! ```
//! use quizmap_common::RenderOptions;
//! use quizmap_core::{DocumentBuilder, Extractor, RawFragment};
//!
//! let options = RenderOptions::default();
//! let fragment = RawFragment {
//!     number: "7".into(),
//!     title: "Direito Penal".into(),
//!     statement_html: "<p>Enunciado</p>".into(),
//!     ..RawFragment::default()
//! };
//! let record = Extractor::new(options.clone()).extract(&fragment, "C").unwrap();
//! assert_eq!(record.label, "7 | C | Direito Penal");
//!
//! let doc = DocumentBuilder::new(&options).build(&[record]).unwrap();
//! assert!(doc.as_str().starts_with("<map version="));
//! ```

pub mod answer;
pub mod document;
pub mod extractor;
pub mod harvest;
pub mod markup;
pub mod resolver;
pub mod types;

pub use answer::{AnswerChain, AnswerStrategy};
pub use document::DocumentBuilder;
pub use extractor::{Extractor, PageExtraction};
pub use harvest::{Harvest, PageReport, RunObserver};
pub use types::{
    AlternativeStat, AnswerKey, Document, PageDump, RawFragment, Record, StatBlob, StatRecord,
};
