//! Buddysim command-line binary
//!
//! Replays a file of allocation requests against a simulated buddy
//! allocator and prints the final memory layout.
//!
//! # Examples
//!
//! ```bash
//! # Replay requests.txt with the default 4 MB / 1 KB geometry
//! buddysim
//!
//! # Custom input and geometry, JSON report
//! buddysim programs.txt --config buddysim.toml --format json
//!
//! # Check allocator invariants after the run, with debug logs on stderr
//! buddysim --verify --log-level debug
//! ```

use buddysim::buddy::{AllocStats, BuddyAllocator, MemoryReport};
use buddysim::{simulation, SimConfig};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Binary buddy allocator simulator
#[derive(Parser, Debug)]
#[command(name = "buddysim")]
#[command(version = buddysim::VERSION)]
#[command(about = "Binary buddy allocator simulator", long_about = None)]
struct Cli {
    /// Request file, one `<label> <sizeKB>` per line
    #[arg(default_value = "requests.txt")]
    input: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, env = "BUDDYSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Check allocator invariants after the run
    #[arg(long)]
    verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// JSON document printed with `--format json`
#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a MemoryReport,
    stats: &'a AllocStats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let config = SimConfig::load(cli.config.as_deref())?;
    let geometry = config.geometry()?;
    let mut allocator = BuddyAllocator::with_geometry(geometry);

    // Keep stdout a single JSON document in JSON mode.
    let mut progress: Box<dyn Write> = match cli.format {
        ReportFormat::Text => Box::new(io::stdout()),
        ReportFormat::Json => Box::new(io::stderr()),
    };

    writeln!(progress, "Buddy allocator initialized.")?;
    writeln!(progress, "Total managed memory: {} KB.", geometry.total_kb())?;
    writeln!(progress, "--------------------------------------------------")?;

    let outcome = simulation::run_file(&mut allocator, &cli.input, &mut progress)?;
    progress.flush()?;
    if let Some(e) = &outcome.aborted {
        info!("Input ended early: {}", e);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let report = allocator.report();
    let stats = allocator.stats();
    match cli.format {
        ReportFormat::Text => {
            write!(out, "\n{}", report)?;
            writeln!(out, "\n[4] Allocation statistics:")?;
            write!(out, "{}", stats)?;
        }
        ReportFormat::Json => {
            serde_json::to_writer_pretty(
                &mut out,
                &JsonOutput {
                    report: &report,
                    stats: &stats,
                },
            )?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    if cli.verify {
        allocator.check_invariants()?;
        info!("Allocator invariants hold");
    }

    Ok(())
}

/// Setup logging on stderr, plus a log file when requested
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, "buddysim.log");
            Some(fmt::layer().with_writer(file_appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}
