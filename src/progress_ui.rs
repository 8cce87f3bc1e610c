//! Console progress bar fed by the transfer engine.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use clipfetch_core::download::{ProgressObserver, TransferProgress};

const BAR_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

/// [`ProgressObserver`] drawing an `indicatif` bar on stderr.
///
/// The bar switches from spinner to bar once the total size is known. When hidden,
/// nothing is drawn.
#[derive(Debug)]
pub(crate) struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub(crate) fn new(visible: bool) -> Self {
        let bar = ProgressBar::with_draw_target(None, draw_target(visible));
        bar.set_style(spinner_style());
        Self { bar }
    }
}

fn draw_target(visible: bool) -> ProgressDrawTarget {
    if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ProgressObserver for ConsoleProgress {
    fn on_start(&self, bytes_done: u64, total_bytes: u64) {
        self.bar.reset();
        if total_bytes > 0 {
            self.bar.set_style(bar_style());
            self.bar.set_length(total_bytes);
        } else {
            self.bar.set_style(spinner_style());
            self.bar.unset_length();
        }
        self.bar.set_position(bytes_done);
    }

    fn on_progress(&self, progress: &TransferProgress) {
        self.bar.set_position(progress.bytes_done);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let progress = ConsoleProgress::new(false);
        progress.on_start(100, 1000);
        assert_eq!(progress.bar.length(), Some(1000));
        assert_eq!(progress.bar.position(), 100);

        progress.on_progress(&TransferProgress::new(400, 1000, 300, Duration::from_secs(1)));
        assert_eq!(progress.bar.position(), 400);

        progress.on_finish();
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn test_unknown_total_has_no_length() {
        let progress = ConsoleProgress::new(false);
        progress.on_start(0, 0);
        assert_eq!(progress.bar.length(), None);
    }
}
