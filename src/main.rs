//! Lure Bundler - Entry Point
//!
//! Wiring sequence:
//! 1. Parse CLI flags
//! 2. Load config.toml (or defaults) + validate, apply CLI overrides
//! 3. Init tracing (JSON structured logging)
//! 4. Pick the catalog source (JSON/JSONL feed or built-in demo)
//! 5. Build report sinks under the output directory
//! 6. Run the allocation once and exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use lure_bundler::adapters::feeds::{DemoCatalogSource, JsonCatalogSource};
use lure_bundler::adapters::metrics::MetricsFileWriter;
use lure_bundler::adapters::persistence::{CsvLayout, CsvReportWriter, JsonReportWriter};
use lure_bundler::config::{self, AppConfig};
use lure_bundler::domain::allocator::BundleAllocator;
use lure_bundler::ports::catalog::CatalogSource;
use lure_bundler::ports::report::ReportSink;
use lure_bundler::usecases::BundleRun;

const DEFAULT_CONFIG: &str = "config.toml";

/// Lure Bundler - Greedy bundle allocation for priced lure catalogs.
#[derive(Parser, Debug)]
#[command(name = "lure-bundler")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Product feed (JSON array or JSONL); overrides catalog.path
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Use the built-in demo catalog instead of a feed
    #[arg(long, conflicts_with = "catalog")]
    demo: bool,

    /// Directory for report files; overrides run.output_dir
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let mut config = match &cli.config {
        Some(path) => config::loader::load_config(&path.to_string_lossy())
            .context("Failed to load configuration")?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            config::loader::load_config(DEFAULT_CONFIG).context("Failed to load configuration")?
        }
        None => AppConfig::default(),
    };

    if let Some(catalog) = &cli.catalog {
        config.catalog.path = Some(catalog.to_string_lossy().into_owned());
    }
    if let Some(dir) = &cli.output_dir {
        config.run.output_dir = dir.to_string_lossy().into_owned();
    }

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.run.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.run.name,
        version = env!("CARGO_PKG_VERSION"),
        output_dir = %config.run.output_dir,
        "Starting Lure Bundler"
    );

    // ── 3. Catalog source ───────────────────────────────────
    let source: Arc<dyn CatalogSource> = if cli.demo {
        Arc::new(DemoCatalogSource)
    } else {
        match &config.catalog.path {
            Some(path) => Arc::new(JsonCatalogSource::new(path)),
            None => anyhow::bail!("No catalog configured: pass --catalog <FILE>, set catalog.path, or use --demo"),
        }
    };

    // ── 4. Allocator + sinks ────────────────────────────────
    let allocator =
        BundleAllocator::new(config.bundle_rules()).context("Invalid bundle rules")?;

    let mut run = BundleRun::new(source, allocator, config.run.name.clone());
    for sink in build_sinks(&config)? {
        run = run.with_sink(sink);
    }

    // ── 5. Run ──────────────────────────────────────────────
    let report = run.execute().await?;

    info!(
        run_id = %report.run_id,
        bundles = report.outcome.bundles.len(),
        leftovers = report.outcome.leftovers.len(),
        excluded = report.outcome.excluded.len(),
        sinks = run.sink_count(),
        "Run finished"
    );

    Ok(())
}

/// Report sinks enabled in `[report]`, rooted at `run.output_dir`.
fn build_sinks(config: &AppConfig) -> Result<Vec<Arc<dyn ReportSink>>> {
    let dir = Path::new(&config.run.output_dir);
    let report = &config.report;
    let mut sinks: Vec<Arc<dyn ReportSink>> = Vec::new();

    if report.csv {
        sinks.push(Arc::new(CsvReportWriter::new(
            dir.join(&report.csv_file),
            CsvLayout::Bundles,
        )));
    }
    if report.flattened {
        sinks.push(Arc::new(CsvReportWriter::new(
            dir.join(&report.flattened_file),
            CsvLayout::Flattened,
        )));
    }
    if report.json {
        sinks.push(Arc::new(JsonReportWriter::new(dir.join(&report.json_file))));
    }
    if report.metrics {
        sinks.push(Arc::new(
            MetricsFileWriter::new(dir.join(&report.metrics_file))
                .context("Failed to create metrics registry")?,
        ));
    }

    Ok(sinks)
}
