//! Bundle Run - One-shot Allocation Workflow
//!
//! 1. Loads the catalog from a `CatalogSource`
//! 2. Runs the greedy allocator against the configured rules
//! 3. Logs every exclusion and the run summary
//! 4. Hands the finished report to each `ReportSink`
//!
//! A failing sink aborts the run; earlier sinks keep what they wrote.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::domain::allocator::BundleAllocator;
use crate::ports::catalog::CatalogSource;
use crate::ports::report::{AllocationReport, ReportSink};

/// Wires a catalog source, the allocator and report sinks together.
pub struct BundleRun {
  /// Where products come from.
  source: Arc<dyn CatalogSource>,
  /// Report writers, called in order.
  sinks: Vec<Arc<dyn ReportSink>>,
  /// Allocator holding validated rules.
  allocator: BundleAllocator,
  /// Name stamped on reports.
  run_name: String,
}

impl BundleRun {
  /// Create a run with no sinks.
  pub fn new(
    source: Arc<dyn CatalogSource>,
    allocator: BundleAllocator,
    run_name: impl Into<String>,
  ) -> Self {
    Self {
      source,
      sinks: Vec::new(),
      allocator,
      run_name: run_name.into(),
    }
  }

  /// Add a report sink.
  #[must_use]
  pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
    self.sinks.push(sink);
    self
  }

  /// Number of configured sinks.
  pub fn sink_count(&self) -> usize {
    self.sinks.len()
  }

  /// Load, allocate, report.
  #[instrument(skip(self), fields(run = %self.run_name, source = %self.source.describe()))]
  pub async fn execute(&self) -> Result<AllocationReport> {
    let catalog = self
      .source
      .load_catalog()
      .await
      .with_context(|| format!("Failed to load catalog from {}", self.source.describe()))?;

    info!(products = catalog.len(), "Catalog loaded");

    let started = Instant::now();
    let outcome = self
      .allocator
      .generate_bundles(&catalog)
      .context("Allocation failed")?;
    let elapsed = started.elapsed();

    for excluded in &outcome.excluded {
      warn!(
        product = %excluded.product.id,
        reason = excluded.reason.kind(),
        detail = %excluded.reason,
        "Product excluded from allocation"
      );
    }

    let stats = outcome.stats;
    debug!(
      passes = stats.passes,
      evictions = stats.evictions,
      backfill_attempts = stats.backfill_attempts,
      backfill_commits = stats.backfill_commits,
      backfill_shortfalls = stats.backfill_shortfalls,
      backfill_rejections = stats.backfill_rejections,
      "Allocator counters"
    );
    info!(
      bundles = outcome.bundles.len(),
      leftovers = outcome.leftovers.len(),
      excluded = outcome.excluded.len(),
      elapsed = ?elapsed,
      "Allocation complete"
    );

    let report = AllocationReport::new(
      self.run_name.clone(),
      self.allocator.rules().clone(),
      outcome,
    )
    .with_elapsed(elapsed);

    for sink in &self.sinks {
      sink
        .write_report(&report)
        .await
        .with_context(|| format!("Report sink '{}' failed", sink.name()))?;
      debug!(sink = sink.name(), "Report sink done");
    }

    Ok(report)
  }
}
