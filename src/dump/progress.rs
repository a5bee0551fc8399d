//! Progress tracking for dump operations
//!
//! Shows a spinner on stderr with the number of pages and documents received
//! so far and the current rate.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress tracker for dump operations
pub struct ProgressTracker {
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a spinner
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} pages {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            start_time: Instant::now(),
            bar,
        }
    }

    /// Update progress with new totals
    ///
    /// # Arguments
    /// * `pages` - Pages received so far
    /// * `documents` - Documents received so far
    pub fn update(&self, pages: u64, documents: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(pages);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = documents as f64 / elapsed;
                bar.set_message(format!("{} documents ({:.0} docs/sec)", documents, speed));
            }
        }
    }

    /// Show a status line, e.g. while waiting for writes
    pub fn set_status(&self, status: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(status.to_string());
        }
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
