//! User-facing console text: summaries, info-only reports, failures, exit codes.

use std::fmt::Write as _;
use std::process::ExitCode;

use clipfetch_core::pipeline::{FetchReport, PipelineError};
use clipfetch_core::resolver::{ResolvedTarget, ResolverEndpoints};
use clipfetch_core::target::ShareLink;

const MIB: f64 = 1024.0 * 1024.0;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::from(1),
            Self::Interrupted => ExitCode::from(130),
        }
    }
}

/// Maps batch counts to the exit outcome. Interruption wins over everything else.
pub(crate) fn determine_exit_outcome(failed: usize, interrupted: bool) -> ProcessExit {
    if interrupted {
        ProcessExit::Interrupted
    } else if failed == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}

#[allow(clippy::cast_precision_loss)]
fn mebibytes(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

/// One-line summary of a committed transfer.
pub(crate) fn completion_line(report: &FetchReport) -> String {
    let outcome = &report.outcome;
    let mut line = format!(
        "Saved {} ({:.2} MB in {:.1}s, {:.2} MB/s)",
        outcome.path.display(),
        mebibytes(outcome.bytes_written),
        outcome.elapsed.as_secs_f64(),
        outcome.average_speed() / MIB,
    );
    if outcome.resumed_from > 0 {
        let _ = write!(line, " resumed from {:.2} MB", mebibytes(outcome.resumed_from));
    }
    if report.target.quality().is_fallback() {
        let _ = write!(line, " [{}]", report.target.quality());
    }
    line
}

/// Multi-line report printed by `--info-only`.
pub(crate) fn info_report(
    link: &ShareLink,
    target: &ResolvedTarget,
    endpoints: &ResolverEndpoints,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Link:      {link}");
    let _ = writeln!(out, "Title:     {}", target.suggested_name().unwrap_or("-"));
    let _ = writeln!(
        out,
        "Asset id:  {}",
        target.asset_id().map_or("-", |id| id.as_str())
    );
    let _ = writeln!(out, "Quality:   {}", target.quality());
    let _ = writeln!(out, "Strategy:  {}", target.strategy());
    let _ = writeln!(out, "URL:       {}", target.url());
    let _ = write!(
        out,
        "Thumbnail: {}",
        target.thumbnail_url(endpoints).as_deref().unwrap_or("-")
    );
    out
}

/// Failure report naming the stage, the kind, and any bytes kept for resume.
pub(crate) fn failure_report(input: &str, err: &PipelineError) -> String {
    let mut out = format!(
        "Error [{} / {}] {}: {err}",
        err.stage(),
        err.kind(),
        input.trim()
    );
    let secured = err.bytes_secured();
    if secured > 0 {
        let _ = write!(
            out,
            "\n  {secured} bytes secured in the partial file; run again to resume"
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use clipfetch_core::download::{TransferError, TransferOutcome};
    use clipfetch_core::resolver::Quality;
    use clipfetch_core::session::SessionError;
    use clipfetch_core::target;

    use super::*;

    fn link() -> ShareLink {
        target::normalize("https://sora.chatgpt.com/p/s_abc123").unwrap()
    }

    #[test]
    fn test_exit_outcome() {
        assert_eq!(determine_exit_outcome(0, false), ProcessExit::Success);
        assert_eq!(determine_exit_outcome(2, false), ProcessExit::Failure);
        assert_eq!(determine_exit_outcome(0, true), ProcessExit::Interrupted);
    }

    #[test]
    fn test_completion_line_reports_size_and_fallback() {
        let report = FetchReport {
            link: link(),
            target: ResolvedTarget::new("https://p.example/d", Quality::ProxyFallback, "proxy_fallback"),
            outcome: TransferOutcome {
                path: PathBuf::from("out/My_Cool_Video_.mp4"),
                bytes_written: 1_048_576,
                bytes_transferred: 1_048_576,
                resumed_from: 0,
                elapsed: Duration::from_secs(2),
                restarted: false,
            },
        };
        let line = completion_line(&report);
        assert!(line.contains("out/My_Cool_Video_.mp4"), "{line}");
        assert!(line.contains("1.00 MB"), "{line}");
        assert!(line.contains("0.50 MB/s"), "{line}");
        assert!(line.contains("[proxy_fallback]"), "{line}");
    }

    #[test]
    fn test_info_report_lists_fields() {
        let target = ResolvedTarget::new("https://cdn.example/v.mp4", Quality::Authentic, "page_embedded")
            .with_suggested_name(Some("My Cool Video!".into()));
        let text = info_report(&link(), &target, &ResolverEndpoints::default());
        assert!(text.contains("Title:     My Cool Video!"));
        assert!(text.contains("Quality:   authentic"));
        assert!(text.contains("Strategy:  page_embedded"));
        assert!(text.contains("Asset id:  -"));
    }

    #[test]
    fn test_failure_report_mentions_bytes_secured() {
        let err = PipelineError::Transfer(TransferError::interrupted(
            "https://cdn.example/v.mp4",
            "v.mp4.partial",
            4096,
            SessionError::http_status("https://cdn.example/v.mp4", 503),
        ));
        let text = failure_report(" https://sora.chatgpt.com/p/s_1 ", &err);
        assert!(text.starts_with("Error [transfer / HttpStatusError] https://sora.chatgpt.com/p/s_1"));
        assert!(text.contains("4096 bytes secured"));
    }
}
