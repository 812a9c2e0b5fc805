//! Progress display for transfers

use indicatif::{ProgressBar, ProgressStyle};

/// Byte-oriented progress bar for downloads and object transfers
#[derive(Clone)]
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    /// Create a progress display; hidden entirely when not enabled.
    pub fn bytes(prefix: &str, total: Option<u64>, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = match total {
            Some(total) => {
                let style = ProgressStyle::default_bar()
                    .template("{prefix}: [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                    .unwrap()
                    .progress_chars("#>-");
                let bar = ProgressBar::new(total);
                bar.set_style(style);
                bar
            }
            None => {
                let style = ProgressStyle::default_spinner()
                    .template("{prefix}: {bytes} ({bytes_per_sec})")
                    .unwrap();
                let bar = ProgressBar::new_spinner();
                bar.set_style(style);
                bar
            }
        };
        bar.set_prefix(prefix.to_string());
        Self { bar }
    }

    pub fn set_position(&self, bytes: u64) {
        self.bar.set_position(bytes);
    }

    pub fn inc(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    /// Finish and clear the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
