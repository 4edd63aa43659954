//! Record collection across the pages of one run.

use serde::Serialize;

use crate::document::DocumentBuilder;
use crate::extractor::Extractor;
use crate::types::{Document, PageDump, Record};
use quizmap_common::Result;

/// Outcome of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub page: String,
    /// Answer key entries resolved from the page statistics.
    pub resolved: usize,
    pub extracted: usize,
    pub discarded: usize,
}

/// Progress hooks for a run. Every method defaults to doing nothing.
pub trait RunObserver: Send {
    fn page_started(&mut self, _page: &str) {}

    fn page_finished(&mut self, _report: &PageReport) {}

    fn run_finished(&mut self, _records: usize) {}
}

/// Append-only records of one run. `finish` consumes it, so the map is
/// built exactly once.
pub struct Harvest {
    extractor: Extractor,
    records: Vec<Record>,
    reports: Vec<PageReport>,
    observer: Option<Box<dyn RunObserver>>,
}

impl Harvest {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            records: Vec::new(),
            reports: Vec::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn add_page(&mut self, page: &PageDump) -> PageReport {
        let name = page.label().to_string();
        if let Some(observer) = self.observer.as_mut() {
            observer.page_started(&name);
        }

        let extraction = self.extractor.extract_page(page);
        let report = PageReport {
            page: name,
            resolved: extraction.answer_key.len(),
            extracted: extraction.records.len(),
            discarded: extraction.discarded,
        };
        self.records.extend(extraction.records);

        if let Some(observer) = self.observer.as_mut() {
            observer.page_finished(&report);
        }
        self.reports.push(report.clone());
        report
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn reports(&self) -> &[PageReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(mut self, builder: &DocumentBuilder) -> Result<Document> {
        tracing::info!(
            pages = self.reports.len(),
            records = self.records.len(),
            "harvest finished"
        );
        if let Some(observer) = self.observer.as_mut() {
            observer.run_finished(self.records.len());
        }
        builder.build(&self.records)
    }
}
