//! Progress bars for enrichment jobs.
//!
//! Bars are drawn only on an interactive terminal; otherwise a hidden bar
//! absorbs the updates.

use indicatif::{ProgressBar, ProgressStyle};

/// How progress is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: draw progress bars.
    Interactive,
    /// Non-TTY or `--quiet`: results only.
    Quiet,
    /// `--json`: nothing but the JSON document on stdout.
    Silent,
}

impl ProgressMode {
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

const BAR_TEMPLATE: &str = "[{bar:20.cyan/dim}] {percent:>3}% ({pos}/{len}) {msg} ({elapsed})";

const BAR_CHARS: &str = "█░";

/// A determinate progress bar whose length can grow once the total is known.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a bar with an unknown total.
    pub fn bar(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                pb.set_style(style.progress_chars(BAR_CHARS));
            }
            pb.set_message(message.to_string());
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Record `done` of `total` units.
    pub fn update(&self, done: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
    }

    /// Remove the bar from the terminal.
    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}
