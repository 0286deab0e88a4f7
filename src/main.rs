use anyhow::{Context, Result};
use clap::Parser;
use clipmerge_rs::{cli, config::Config, fastq, pipeline};
use mimalloc::MiMalloc;
use std::io::Write as _;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let started = Instant::now();
    let config = Config::from_args(&args)?;
    let mut log = fastq::open_log(config.log.as_deref())?;
    let stats = pipeline::run(&config)?;

    write!(log, "{}", stats.report(config.show_clipping_stats)).context("failed to write statistics report")?;
    log.flush().context("failed to flush statistics report")?;

    tracing::info!(
        pairs = stats.pairs(),
        merged = stats.merged,
        usable_reads = stats.usable_reads(),
        failed_clipping = stats.failed_clipping,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "clipmerge-rs: processing complete"
    );
    Ok(())
}
