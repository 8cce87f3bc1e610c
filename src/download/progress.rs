//! Progress snapshots and the observer seam used by the transfer engine.

use std::time::Duration;

/// Point-in-time view of a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// Bytes present in the staging file, including resumed bytes.
    pub bytes_done: u64,
    /// Declared total size, or 0 when unknown.
    pub total_bytes: u64,
    /// Time since this transfer call started.
    pub elapsed: Duration,
    /// Average throughput of this call in bytes per second.
    pub speed_bytes_per_sec: f64,
    /// Completion percentage, when the total is known.
    pub percent: Option<f64>,
    /// Estimated time remaining, when the total and speed are known.
    pub eta: Option<Duration>,
}

impl TransferProgress {
    /// Builds a snapshot.
    ///
    /// `session_bytes` counts only bytes received by this call, so speed is not inflated
    /// by data resumed from a previous run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bytes_done: u64, total_bytes: u64, session_bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let speed_bytes_per_sec = if secs > 0.0 {
            session_bytes as f64 / secs
        } else {
            0.0
        };

        let percent = (total_bytes > 0)
            .then(|| (bytes_done as f64 / total_bytes as f64 * 100.0).min(100.0));

        let eta = (total_bytes > 0 && speed_bytes_per_sec > 0.0).then(|| {
            let remaining = total_bytes.saturating_sub(bytes_done) as f64;
            Duration::from_secs_f64(remaining / speed_bytes_per_sec)
        });

        Self {
            bytes_done,
            total_bytes,
            elapsed,
            speed_bytes_per_sec,
            percent,
            eta,
        }
    }
}

/// Receives progress from the transfer engine.
///
/// Called inline on the transfer task after every chunk, so implementations must return
/// quickly and never block.
pub trait ProgressObserver: Send + Sync {
    /// A response was accepted; `bytes_done` bytes are already on disk.
    fn on_start(&self, _bytes_done: u64, _total_bytes: u64) {}

    /// A chunk was written.
    fn on_progress(&self, progress: &TransferProgress);

    /// The transfer ended, successfully or not.
    fn on_finish(&self) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _progress: &TransferProgress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_total_has_no_percent_or_eta() {
        let progress = TransferProgress::new(500, 0, 500, Duration::from_secs(1));
        assert!(progress.percent.is_none());
        assert!(progress.eta.is_none());
        assert!((progress.speed_bytes_per_sec - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_total_computes_percent_and_eta() {
        let progress = TransferProgress::new(250, 1000, 250, Duration::from_secs(1));
        assert_eq!(progress.percent, Some(25.0));
        assert_eq!(progress.eta, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_speed_excludes_resumed_bytes() {
        let progress = TransferProgress::new(900, 1000, 100, Duration::from_secs(2));
        assert!((progress.speed_bytes_per_sec - 50.0).abs() < f64::EPSILON);
        assert_eq!(progress.eta, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_elapsed_yields_zero_speed() {
        let progress = TransferProgress::new(10, 100, 10, Duration::ZERO);
        assert!(progress.speed_bytes_per_sec.abs() < f64::EPSILON);
        assert!(progress.eta.is_none());
        assert_eq!(progress.percent, Some(10.0));
    }
}
