//! Download progress bar on stderr.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use optical_core::ProgressEvent;

const BAR_TEMPLATE: &str = "Download [{bar:40}] {percent:>3}% {bytes}/{total_bytes}";
const SPINNER_TEMPLATE: &str = "{spinner} Download {bytes}";

/// Renders [`ProgressEvent`]s; a no-op when disabled.
///
/// The bar is created on the first event, once it is known whether the
/// server sent a content length.
pub(crate) struct DownloadProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    pub(crate) fn update(&mut self, event: ProgressEvent) {
        if !self.enabled {
            return;
        }
        let bar = self
            .bar
            .get_or_insert_with(|| create_bar(event.total_bytes));
        if let Some(total) = event.total_bytes {
            bar.set_length(total.max(event.bytes_so_far));
        }
        bar.set_position(event.bytes_so_far);
    }

    /// Clears the bar after a completed or abandoned download.
    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn create_bar(total_bytes: Option<u64>) -> ProgressBar {
    match total_bytes.filter(|total| *total > 0) {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars(">> "),
            );
            bar
        }
        None => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        }
    }
}
