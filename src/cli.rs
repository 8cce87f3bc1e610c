//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use clipfetch_core::resolver::ResolverMode;
use clipfetch_core::session::ImpersonationProfile;

/// Save shared video posts as local MP4 files.
///
/// Each share-link is resolved to the best available asset (clean source first,
/// then proxy, then watermarked rendition) and transferred with resume support.
/// Links are read from the arguments, or from stdin when none are given.
#[derive(Parser, Debug)]
#[command(name = "clipfetch")]
#[command(author, version, about)]
#[command(after_help = "With no URL arguments and nothing piped on stdin, clipfetch prints a hint and exits 0.")]
pub struct Args {
    /// Share-links to fetch, in order
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Output path: a file for a single link, otherwise a directory
    #[arg(short = 'o', long, value_name = "PATH", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Discard any partial file and start from zero
    #[arg(long)]
    pub no_resume: bool,

    /// Auth cookie sent with share-page requests (`name=value; ...`)
    #[arg(long, value_name = "VALUE")]
    pub cookie: Option<String>,

    /// Never use the third-party proxy fallback
    #[arg(long)]
    pub no_proxy_fallback: bool,

    /// Upstream HTTP proxy for all requests
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Resolution pipeline
    #[arg(long, value_name = "page|browser")]
    pub pipeline: Option<ResolverMode>,

    /// Browser driver program used by the browser pipeline
    #[arg(long, value_name = "PATH")]
    pub browser_command: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub visible: bool,

    /// Request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Wait after browser navigation in milliseconds (max 60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub settle_ms: Option<u64>,

    /// Header impersonation profile
    #[arg(long, value_name = "chrome|firefox|tool")]
    pub profile: Option<ImpersonationProfile>,

    /// Resolve and print details without transferring
    #[arg(long)]
    pub info_only: bool,

    /// Config file (default: $XDG_CONFIG_HOME/clipfetch/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["clipfetch"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.no_resume);
        assert!(!args.no_proxy_fallback);
        assert!(!args.info_only);
        assert!(args.pipeline.is_none());
        assert!(args.timeout.is_none());
    }

    #[test]
    fn test_cli_multiple_urls_keep_order() {
        let args = Args::try_parse_from([
            "clipfetch",
            "https://sora.chatgpt.com/p/s_1",
            "https://sora.chatgpt.com/p/s_2",
        ])
        .unwrap();
        assert_eq!(
            args.urls,
            vec![
                "https://sora.chatgpt.com/p/s_1",
                "https://sora.chatgpt.com/p/s_2"
            ]
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["clipfetch", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["clipfetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["clipfetch", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["clipfetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["clipfetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["clipfetch", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_output_flags() {
        let args = Args::try_parse_from(["clipfetch", "-o", "clip.mp4", "u"]).unwrap();
        assert_eq!(args.output, Some(PathBuf::from("clip.mp4")));

        let args = Args::try_parse_from(["clipfetch", "-d", "videos", "u"]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("videos")));
    }

    #[test]
    fn test_cli_output_and_output_dir_conflict() {
        let err = Args::try_parse_from(["clipfetch", "-o", "a.mp4", "-d", "dir", "u"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_pipeline_values() {
        let args = Args::try_parse_from(["clipfetch", "--pipeline", "browser"]).unwrap();
        assert_eq!(args.pipeline, Some(ResolverMode::Browser));

        let args = Args::try_parse_from(["clipfetch", "--pipeline", "page"]).unwrap();
        assert_eq!(args.pipeline, Some(ResolverMode::Page));

        let err = Args::try_parse_from(["clipfetch", "--pipeline", "api"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_profile_values() {
        let args = Args::try_parse_from(["clipfetch", "--profile", "firefox"]).unwrap();
        assert_eq!(args.profile, Some(ImpersonationProfile::Firefox));

        let err = Args::try_parse_from(["clipfetch", "--profile", "lynx"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_range() {
        let args = Args::try_parse_from(["clipfetch", "--timeout", "3600"]).unwrap();
        assert_eq!(args.timeout, Some(3600));

        let err = Args::try_parse_from(["clipfetch", "--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_settle_ms_range() {
        let args = Args::try_parse_from(["clipfetch", "--settle-ms", "0"]).unwrap();
        assert_eq!(args.settle_ms, Some(0));

        let err = Args::try_parse_from(["clipfetch", "--settle-ms", "60001"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_boolean_switches() {
        let args = Args::try_parse_from([
            "clipfetch",
            "--no-resume",
            "--no-proxy-fallback",
            "--visible",
            "--info-only",
            "u",
        ])
        .unwrap();
        assert!(args.no_resume);
        assert!(args.no_proxy_fallback);
        assert!(args.visible);
        assert!(args.info_only);
    }

    #[test]
    fn test_cli_string_options() {
        let args = Args::try_parse_from([
            "clipfetch",
            "--cookie",
            "session=abc",
            "--proxy",
            "http://127.0.0.1:8080",
            "--browser-command",
            "/opt/driver",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(args.cookie.as_deref(), Some("session=abc"));
        assert_eq!(args.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(args.browser_command, Some(PathBuf::from("/opt/driver")));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
