//! Ordered answer strategies for a single item.
//!
//! Each strategy either produces an answer or declines; a chain asks them in
//! order and keeps the first answer. Nothing here fails: an unreadable
//! source is the same as no answer.

use crate::resolver::{first_hit, parse_stats};
use crate::types::{AnswerKey, RawFragment};

pub trait AnswerStrategy: Send + Sync {
    fn answer(&self, fragment: &RawFragment) -> Option<String>;
}

/// An answer already resolved by the caller. Empty means none.
pub struct Supplied<'a>(pub &'a str);

impl AnswerStrategy for Supplied<'_> {
    fn answer(&self, _fragment: &RawFragment) -> Option<String> {
        let answer = self.0.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }
}

/// Look the fragment's number up in a page key.
pub struct KeyLookup<'a>(pub &'a AnswerKey);

impl AnswerStrategy for KeyLookup<'_> {
    fn answer(&self, fragment: &RawFragment) -> Option<String> {
        let number = crate::resolver::normalize_number(&fragment.number);
        self.0
            .get(&number)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string)
    }
}

/// The fragment's own statistics, same rule as the page resolver.
pub struct EmbeddedStats;

impl AnswerStrategy for EmbeddedStats {
    fn answer(&self, fragment: &RawFragment) -> Option<String> {
        let payload = fragment.embedded_stats.as_deref()?;
        match parse_stats(payload) {
            Ok(stats) => first_hit(&stats).map(|hit| hit.id.clone()),
            Err(err) => {
                tracing::warn!(
                    item = %fragment.number,
                    error = %err,
                    "ignoring unreadable embedded statistics"
                );
                None
            }
        }
    }
}

/// First-success combination of strategies.
#[derive(Default)]
pub struct AnswerChain<'a> {
    strategies: Vec<Box<dyn AnswerStrategy + 'a>>,
}

impl<'a> AnswerChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, strategy: impl AnswerStrategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// The first answer any strategy gives, or an empty string.
    pub fn resolve(&self, fragment: &RawFragment) -> String {
        self.strategies
            .iter()
            .find_map(|s| s.answer(fragment))
            .unwrap_or_default()
    }
}
