//! Spinner on stderr and a log writer that keeps out of its way.

use std::io::{self, Write};
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use reviewgen_core::ReviewProgress;

/// Spinner currently drawn on stderr, if any.
static ACTIVE_SPINNER: OnceLock<RwLock<Option<ProgressBar>>> = OnceLock::new();

fn active_spinner() -> &'static RwLock<Option<ProgressBar>> {
    ACTIVE_SPINNER.get_or_init(|| RwLock::new(None))
}

fn set_active_spinner(spinner: Option<ProgressBar>) {
    if let Ok(mut guard) = active_spinner().write() {
        *guard = spinner;
    }
}

/// Stderr writer for the tracing subscriber. Each log line is written with
/// the active spinner suspended so the two never share a terminal line.
pub(crate) struct SpinnerAwareStderr;

impl Write for SpinnerAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let write = || io::stderr().lock().write_all(buf).map(|()| buf.len());
        match active_spinner().read() {
            Ok(guard) => match guard.as_ref() {
                Some(spinner) => spinner.suspend(write),
                None => write(),
            },
            Err(_) => write(),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr while the pipeline works, cleared before the review
/// starts printing.
pub(crate) struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new(hidden: bool) -> Self {
        let spinner = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        if !hidden {
            set_active_spinner(Some(spinner.clone()));
        }
        Self { spinner }
    }

    pub(crate) fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
            set_active_spinner(None);
        }
    }
}

impl ReviewProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_scraped(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scraping [{current}/{total}] {url}"));
    }

    fn source_failed(&self, url: &str, _error: &str) {
        self.spinner.set_message(format!("Skipped {url}"));
    }
}
