//! find-dir-stream - Streaming Directory Walker
//!
//! Entry point for the CLI application. Prints one line per directory whose
//! path matches `--match` (all directories by default).

use anyhow::{Context, Result};
use clap::Parser;
use find_dir_stream::config::{CliArgs, OutputFormat, WalkConfig};
use find_dir_stream::progress::{print_header, print_summary};
use find_dir_stream::walker::{DirStream, ListingEvent};
use find_dir_stream::LocalFileSystem;
use futures::StreamExt;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = WalkConfig::from_args(args).context("Invalid configuration")?;

    if config.show_summary {
        print_header(&config.root.display().to_string(), &config.options);
    }

    // All engine state lives on one task; a current-thread runtime is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(walk(config))
}

async fn walk(config: WalkConfig) -> Result<()> {
    let start = Instant::now();
    let mut stream = DirStream::new(&config.root, Arc::new(LocalFileSystem::new()), config.options);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut printed = 0u64;

    while let Some(event) = stream.next().await {
        if !config.matches(&event.dir) {
            continue;
        }
        write_event(&mut out, &event, config.format).context("Failed to write output")?;
        printed += 1;
    }
    out.flush().context("Failed to flush output")?;

    let stats = stream.stats();
    if config.show_summary {
        print_summary(&stats, printed, start.elapsed());
    }

    let errors = stats.listings_failed + stats.probes_failed;
    if errors > 0 {
        info!(errors = errors, "Walk completed with errors");
    }

    Ok(())
}

fn write_event(out: &mut impl Write, event: &ListingEvent, format: OutputFormat) -> find_dir_stream::Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "{}: {}", event.dir.display(), event.files.join(","))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, event)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("find_dir_stream=debug,warn")
    } else {
        EnvFilter::new("find_dir_stream=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
