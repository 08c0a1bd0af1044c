//! Progress spinner for CLI operations.

use std::time::Duration;

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;

/// Spinner shown while an upload is being ingested.
///
/// Ingestion reports no incremental progress, so this only signals that
/// work is ongoing. Draws to stderr and clears itself on drop.
pub struct CliSpinner {
    bar: ProgressBar,
}

impl CliSpinner {
    /// Starts a spinner with the given message.
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Drop for CliSpinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
