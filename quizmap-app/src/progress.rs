use indicatif::{ProgressBar, ProgressStyle};
use quizmap_core::{PageReport, RunObserver};

/// Terminal progress for a harvest, one tick per page.
pub struct ProgressObserver {
    bar: ProgressBar,
    extracted: usize,
    discarded: usize,
}

impl ProgressObserver {
    pub fn new(pages: usize) -> Self {
        let bar = ProgressBar::new(pages as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self {
            bar,
            extracted: 0,
            discarded: 0,
        }
    }
}

impl RunObserver for ProgressObserver {
    fn page_started(&mut self, page: &str) {
        self.bar.set_message(page.to_string());
    }

    fn page_finished(&mut self, report: &PageReport) {
        self.extracted += report.extracted;
        self.discarded += report.discarded;
        self.bar.inc(1);
    }

    fn run_finished(&mut self, records: usize) {
        self.bar.finish_with_message(format!(
            "{records} items ({} discarded)",
            self.discarded
        ));
        tracing::debug!(extracted = self.extracted, discarded = self.discarded, "progress closed");
    }
}
