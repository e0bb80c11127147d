//! Prometheus Metrics Registry - Allocation Observability
//!
//! Registers allocation gauges under the `lure_bundler_*` prefix and renders
//! them with the text encoder. Gauges rather than counters: every file
//! describes exactly one run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::{info, instrument};

use crate::adapters::persistence::write_atomic;
use crate::ports::report::{AllocationReport, ReportSink};

/// Centralized Prometheus metrics for an allocation run.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Bundles committed.
    pub bundles_formed: IntGauge,
    /// Products by outcome (`bundled`, `leftover`, `excluded`).
    pub products: IntGaugeVec,
    /// Exclusions by reason kind.
    pub exclusions: IntGaugeVec,
    /// Backfill attempts by result (`attempt`, `commit`, `shortfall`, `rejection`).
    pub backfills: IntGaugeVec,
    /// Items rolled back from an invalid full bundle.
    pub evictions: IntGauge,
    /// Walks over the sorted pool.
    pub passes: IntGauge,
    /// Wall-clock allocation time.
    pub allocation_seconds: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let bundles_formed =
            IntGauge::new("lure_bundler_bundles_formed", "Bundles committed in the run")?;

        let products = IntGaugeVec::new(
            Opts::new("lure_bundler_products", "Catalog products by allocation outcome"),
            &["status"],
        )?;

        let exclusions = IntGaugeVec::new(
            Opts::new(
                "lure_bundler_exclusions",
                "Products excluded before allocation, by reason",
            ),
            &["reason"],
        )?;

        let backfills = IntGaugeVec::new(
            Opts::new("lure_bundler_backfills", "Backfill activity by result"),
            &["result"],
        )?;

        let evictions = IntGauge::new(
            "lure_bundler_evictions",
            "Items evicted after completing an invalid bundle",
        )?;

        let passes = IntGauge::new(
            "lure_bundler_packing_passes",
            "Packing passes over the sorted pool",
        )?;

        let allocation_seconds = Gauge::new(
            "lure_bundler_allocation_seconds",
            "Wall-clock time spent in the allocator",
        )?;

        // Register all metrics
        registry.register(Box::new(bundles_formed.clone()))?;
        registry.register(Box::new(products.clone()))?;
        registry.register(Box::new(exclusions.clone()))?;
        registry.register(Box::new(backfills.clone()))?;
        registry.register(Box::new(evictions.clone()))?;
        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(allocation_seconds.clone()))?;

        Ok(Self {
            registry,
            bundles_formed,
            products,
            exclusions,
            backfills,
            evictions,
            passes,
            allocation_seconds,
        })
    }

    /// Load the gauges from a finished run.
    pub fn record(&self, report: &AllocationReport) {
        let outcome = &report.outcome;
        let stats = &outcome.stats;
        let bundled: usize = outcome.bundles.iter().map(|b| b.len()).sum();

        self.bundles_formed.set(gauge_value(outcome.bundles.len()));
        self.products.with_label_values(&["bundled"]).set(gauge_value(bundled));
        self.products
            .with_label_values(&["leftover"])
            .set(gauge_value(outcome.leftovers.len()));
        self.products
            .with_label_values(&["excluded"])
            .set(gauge_value(outcome.excluded.len()));

        self.exclusions.reset();
        for excluded in &outcome.excluded {
            self.exclusions
                .with_label_values(&[excluded.reason.kind()])
                .inc();
        }

        for (result, value) in [
            ("attempt", stats.backfill_attempts),
            ("commit", stats.backfill_commits),
            ("shortfall", stats.backfill_shortfalls),
            ("rejection", stats.backfill_rejections),
        ] {
            self.backfills.with_label_values(&[result]).set(gauge_value(value));
        }

        self.evictions.set(gauge_value(stats.evictions));
        self.passes.set(gauge_value(stats.passes));
        self.allocation_seconds.set(report.elapsed.as_secs_f64());
    }

    /// Render every registered metric in Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output was not UTF-8")
    }
}

fn gauge_value(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Report sink writing a Prometheus textfile.
pub struct MetricsFileWriter {
    path: PathBuf,
    metrics: MetricsRegistry,
}

impl MetricsFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            metrics: MetricsRegistry::new()?,
        })
    }
}

#[async_trait]
impl ReportSink for MetricsFileWriter {
    #[instrument(skip(self, report), fields(path = %self.path.display()))]
    async fn write_report(&self, report: &AllocationReport) -> Result<()> {
        self.metrics.record(report);
        let text = self.metrics.render()?;
        write_atomic(&self.path, text.as_bytes()).await?;
        info!("Metrics file written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}
