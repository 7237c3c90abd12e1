//! Download progress bar

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Progress indicator for a single download call
///
/// The bar is closed when the reporter is dropped: finished if it reached its
/// length, abandoned otherwise.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a terminal progress bar sized to `total` bytes
    #[must_use]
    pub fn new(label: &str, total: u64) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = ProgressBar::new(total)
            .with_style(style)
            .with_message(label.to_string());

        Self { bar }
    }

    /// Create a reporter that tracks progress without drawing
    #[must_use]
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self { bar }
    }

    /// Callback to hand to the transfer
    ///
    /// Each call advances the bar by the bytes received since the previous
    /// call. A retried attempt that restarts from a lower count moves the bar
    /// back to that count.
    pub fn callback(&self) -> impl Fn(u64, u64) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |current, total| {
            if total > 0 && bar.length() != Some(total) {
                bar.set_length(total);
            }

            let reported = bar.position();
            if current >= reported {
                bar.inc(current - reported);
            } else {
                bar.set_position(current);
            }

            tracing::trace!(current, total, "download progress");
        }
    }

    /// Bytes reported so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Total bytes the bar expects
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if self.bar.is_finished() {
            return;
        }

        match self.bar.length() {
            Some(len) if len > 0 && self.bar.position() >= len => self.bar.finish(),
            _ => self.bar.abandon(),
        }
    }
}
