//! JSON Report Writer - Atomic Full-Run Snapshot
//!
//! Serializes the whole run: rules, labelled bundles, leftovers,
//! exclusions with reasons, and allocator counters. Written with
//! `write_atomic`, so readers only ever see a complete document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::write_atomic;
use crate::domain::allocator::AllocationStats;
use crate::domain::error::ExclusionReason;
use crate::domain::product::{Product, ProductId};
use crate::domain::rules::BundleRules;
use crate::ports::report::{AllocationReport, BundleSummary, ReportSink};

/// Serialized shape of a run.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: Uuid,
    pub run_name: &'a str,
    pub generated_at: DateTime<Utc>,
    pub elapsed_us: u128,
    pub rules: &'a BundleRules,
    pub bundles: Vec<BundleSummary>,
    pub leftovers: &'a [Product],
    pub excluded: Vec<ExcludedEntry<'a>>,
    pub stats: AllocationStats,
}

/// An excluded product, flattened for readability.
#[derive(Debug, Serialize)]
pub struct ExcludedEntry<'a> {
    pub id: &'a ProductId,
    pub name: &'a str,
    pub reason: &'a ExclusionReason,
    pub detail: String,
}

impl<'a> JsonReport<'a> {
    pub fn from_report(report: &'a AllocationReport) -> Self {
        Self {
            run_id: report.run_id,
            run_name: &report.run_name,
            generated_at: report.generated_at,
            elapsed_us: report.elapsed.as_micros(),
            rules: &report.rules,
            bundles: report.bundle_summaries(),
            leftovers: &report.outcome.leftovers,
            excluded: report
                .outcome
                .excluded
                .iter()
                .map(|e| ExcludedEntry {
                    id: &e.product.id,
                    name: &e.product.name,
                    reason: &e.reason,
                    detail: e.reason.to_string(),
                })
                .collect(),
            stats: report.outcome.stats,
        }
    }
}

/// JSON report sink.
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for JsonReportWriter {
    #[instrument(skip(self, report), fields(run_id = %report.run_id))]
    async fn write_report(&self, report: &AllocationReport) -> Result<()> {
        let json = serde_json::to_string_pretty(&JsonReport::from_report(report))
            .context("Failed to serialize allocation report")?;

        write_atomic(&self.path, json.as_bytes()).await?;

        info!(
            path = %self.path.display(),
            bundles = report.outcome.bundles.len(),
            "JSON report written"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocator::generate_bundles;
    use crate::domain::product::price_map;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_json_report_contents() {
        let mut catalog: Vec<_> = (0..6)
            .map(|i| {
                Product::new(
                    format!("P{i}"),
                    format!("Lure {i}"),
                    price_map([("USD", dec!(16)), ("AUD", dec!(23))]),
                    Some(dec!(850)),
                )
            })
            .collect();
        catalog.push(Product::new(
            "BROKEN",
            "No cost",
            price_map([("USD", dec!(16)), ("AUD", dec!(23))]),
            None,
        ));

        let rules = BundleRules::default();
        let outcome = generate_bundles(&catalog, &rules).unwrap();
        let report = AllocationReport::new("json-test", rules, outcome);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        JsonReportWriter::new(&path).write_report(&report).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run_name"], "json-test");
        assert_eq!(value["bundles"][0]["label"], "BUNDLE-001");
        assert_eq!(value["bundles"][0]["product_ids"].as_array().unwrap().len(), 6);
        assert_eq!(value["leftovers"].as_array().unwrap().len(), 0);
        assert_eq!(value["excluded"][0]["id"], "BROKEN");
        assert_eq!(value["excluded"][0]["reason"]["kind"], "missing_cost");
        assert_eq!(value["stats"]["catalog_size"], 7);
        assert_eq!(value["stats"]["accepted"], 6);
    }
}
