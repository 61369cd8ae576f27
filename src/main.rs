use clap::Parser;
use peak_alloc::PeakAlloc;
use prokka2vep::options::Args;
use prokka2vep::pipeline;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let start = Instant::now();
    let diag = pipeline::run(&args.gff, &args.out)?;
    let duration: Duration = start.elapsed();

    if !diag.is_empty() {
        warn!(
            "{} issue(s) were found in {:?}, see the warnings above.",
            diag.len(),
            args.gff
        );
    }
    info!(
        "Converted {:?} in {:?}, peak memory {:.2} MB",
        args.gff,
        duration,
        PEAK_ALLOC.peak_usage_as_mb()
    );

    Ok(())
}
