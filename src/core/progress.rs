//! Progress reporting for project batches using indicatif.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar style for per-project processing.
fn project_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("#>-")
}

/// Check if stderr is a TTY (for deciding whether to show progress bars).
pub fn is_tty() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Progress over the projects of a snapshot. Hidden when stderr is not a
/// terminal or when explicitly requested.
pub struct ProjectProgress {
    bar: ProgressBar,
}

impl ProjectProgress {
    pub fn new(total: usize, message: &str, hidden: bool) -> Self {
        let bar = if hidden || !is_tty() {
            let bar = ProgressBar::hidden();
            bar.set_length(total as u64);
            bar
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(project_style());
            bar
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Move to an absolute position (matches the analyzer progress callback).
    pub fn update(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish and clear the progress bar.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
