//! CLI entry point for clipfetch.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use clipfetch_core::download::{ProgressObserver, TransferEngine};
use clipfetch_core::pipeline::{Destination, Fetcher};
use clipfetch_core::resolver::build_resolver;
use clipfetch_core::session::SessionClient;
use tokio::sync::watch;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod output;
mod progress_ui;
mod settings;
mod terminal;

use cli::Args;
use output::ProcessExit;
use progress_ui::ConsoleProgress;
use settings::RunSettings;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::no_color_env_requested() || terminal::is_dumb_terminal();
    terminal::init_tracing(terminal::default_log_level(&args), no_color);
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.code(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ProcessExit::Failure.code()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let loaded = app_config::load_config(args.config.as_deref())?;
    if loaded.loaded_from_file {
        debug!(path = ?loaded.path, "Loaded config file");
    }
    let settings = RunSettings::merge(&args, &loaded.file_config());

    let links = read_links(&args)?;
    if links.is_empty() {
        info!("No share-links provided. Pass them as arguments or pipe them via stdin.");
        info!("Example: clipfetch https://sora.chatgpt.com/p/s_0123456789abcdef");
        return Ok(ProcessExit::Success);
    }
    info!(links = links.len(), mode = %settings.resolver.mode, "clipfetch starting");

    let session = SessionClient::new(settings.session.clone())
        .context("Failed to set up the HTTP session")?;
    let resolver = build_resolver(session.clone(), settings.resolver.clone());

    let show_progress = !settings.info_only
        && terminal::should_show_progress(
            io::stderr().is_terminal(),
            args.quiet,
            terminal::is_dumb_terminal(),
        );
    let progress = Arc::new(ConsoleProgress::new(show_progress));
    let engine = TransferEngine::new(session).with_observer(progress.clone());
    let fetcher = Fetcher::new(settings.pattern.clone(), resolver, engine);
    let destination = settings.destination(links.len());

    let (interrupt_tx, mut interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let mut failed = 0usize;
    let mut interrupted = false;
    for input in &links {
        tokio::select! {
            ok = process_link(&fetcher, &settings, &destination, input, args.quiet) => {
                if !ok {
                    failed += 1;
                }
            }
            Ok(()) = interrupt_rx.changed() => {
                progress.on_finish();
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        warn!("Interrupted. Partial data was kept; run again to resume.");
    } else {
        info!(total = links.len(), failed, "Done");
    }
    Ok(output::determine_exit_outcome(failed, interrupted))
}

/// Fetches or inspects one link, reporting the result. Returns false on failure.
async fn process_link(
    fetcher: &Fetcher,
    settings: &RunSettings,
    destination: &Destination,
    input: &str,
    quiet: bool,
) -> bool {
    if settings.info_only {
        return match fetcher.inspect(input).await {
            Ok((link, target)) => {
                println!(
                    "{}",
                    output::info_report(&link, &target, fetcher.resolver().endpoints())
                );
                true
            }
            Err(err) => {
                eprintln!("{}", output::failure_report(input, &err));
                false
            }
        };
    }

    match fetcher.fetch(input, destination, settings.resume).await {
        Ok(report) => {
            if !quiet {
                println!("{}", output::completion_line(&report));
            }
            true
        }
        Err(err) => {
            eprintln!("{}", output::failure_report(input, &err));
            false
        }
    }
}

/// Share-links from the arguments, or one per line from piped stdin.
///
/// Blank lines and `#` comments are skipped.
fn read_links(args: &Args) -> Result<Vec<String>> {
    if !args.urls.is_empty() {
        return Ok(args.urls.clone());
    }
    if io::stdin().is_terminal() {
        return Ok(Vec::new());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read share-links from stdin")?;
    Ok(parse_link_lines(&buffer))
}

fn parse_link_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
