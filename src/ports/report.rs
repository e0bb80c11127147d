//! Report Port - Allocation Output Interface
//!
//! A finished allocation run is packaged as an `AllocationReport` and
//! handed to every configured sink (CSV, JSON, metrics, ...). Bundle
//! labels are assigned here, from output position, never stored on the
//! bundles themselves.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::allocator::AllocationOutcome;
use crate::domain::bundle::{bundle_label, flatten, LabeledProduct};
use crate::domain::product::ProductId;
use crate::domain::rules::BundleRules;

/// A completed allocation run, ready for serialization.
#[derive(Debug, Clone)]
pub struct AllocationReport {
  /// Unique id of this run.
  pub run_id: Uuid,
  /// Configured run name.
  pub run_name: String,
  /// When the allocation finished.
  pub generated_at: DateTime<Utc>,
  /// Rules the run was evaluated against.
  pub rules: BundleRules,
  /// Bundles, leftovers, exclusions and counters.
  pub outcome: AllocationOutcome,
  /// Wall-clock time spent in the allocator.
  pub elapsed: Duration,
}

/// One bundle as it appears in reports.
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
  /// `BUNDLE-001`, `BUNDLE-002`, ...
  pub label: String,
  /// Member ids in placement order.
  pub product_ids: Vec<ProductId>,
  /// Total per shared currency.
  pub totals: BTreeMap<String, Decimal>,
  /// Mean base cost.
  pub average_cost: Decimal,
  /// Aggregate margin, when the margin rule is enabled.
  pub margin: Option<Decimal>,
}

impl AllocationReport {
  /// Wrap an outcome with a fresh run id and timestamp.
  pub fn new(
    run_name: impl Into<String>,
    rules: BundleRules,
    outcome: AllocationOutcome,
  ) -> Self {
    Self {
      run_id: Uuid::new_v4(),
      run_name: run_name.into(),
      generated_at: Utc::now(),
      rules,
      outcome,
      elapsed: Duration::ZERO,
    }
  }

  /// Record how long the allocation took.
  pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
    self.elapsed = elapsed;
    self
  }

  /// Labelled per-bundle rows, numbered by output position.
  pub fn bundle_summaries(&self) -> Vec<BundleSummary> {
    self
      .outcome
      .bundles
      .iter()
      .enumerate()
      .map(|(i, bundle)| BundleSummary {
        label: bundle_label(i + 1),
        product_ids: bundle.product_ids().cloned().collect(),
        totals: bundle.totals.clone(),
        average_cost: bundle.average_cost,
        margin: bundle.margin,
      })
      .collect()
  }

  /// Flattened view: every bundled or leftover product with its label.
  pub fn labeled_products(&self) -> Vec<LabeledProduct> {
    flatten(&self.outcome.bundles, &self.outcome.leftovers)
  }

  /// Currencies totalled on every bundle, in stable order.
  ///
  /// Used as CSV columns so each row has a value in each column.
  pub fn report_currencies(&self) -> Vec<String> {
    let mut bundles = self.outcome.bundles.iter();
    let Some(first) = bundles.next() else {
      let mut currencies = vec![self.rules.reference_currency.clone()];
      if let Some(secondary) = &self.rules.secondary {
        currencies.push(secondary.currency.clone());
      }
      return currencies;
    };
    let mut currencies: Vec<String> = first.totals.keys().cloned().collect();
    for bundle in bundles {
      currencies.retain(|c| bundle.totals.contains_key(c));
    }
    // Reference currency leads.
    if let Some(i) = currencies
      .iter()
      .position(|c| *c == self.rules.reference_currency)
    {
      let reference = currencies.remove(i);
      currencies.insert(0, reference);
    }
    currencies
  }
}

/// Trait for report writers.
#[async_trait]
pub trait ReportSink: Send + Sync + 'static {
  /// Persist the report. Called once per run.
  async fn write_report(&self, report: &AllocationReport) -> anyhow::Result<()>;

  /// Sink name for logs.
  fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::allocator::generate_bundles;
  use crate::domain::product::{price_map, Product};
  use rust_decimal_macros::dec;

  fn lure(id: &str, prices: BTreeMap<String, Decimal>) -> Product {
    Product::new(id, id, prices, Some(dec!(850)))
  }

  #[test]
  fn test_report_currencies_reference_first() {
    let catalog: Vec<_> = (0..6)
      .map(|i| {
        lure(
          &format!("P{i}"),
          price_map([("AUD", dec!(23)), ("EUR", dec!(15)), ("USD", dec!(16))]),
        )
      })
      .collect();
    let rules = BundleRules::default();
    let outcome = generate_bundles(&catalog, &rules).unwrap();
    let report = AllocationReport::new("t", rules, outcome);

    assert_eq!(report.report_currencies(), vec!["USD", "AUD", "EUR"]);
  }

  #[test]
  fn test_report_currencies_without_bundles() {
    let rules = BundleRules::default();
    let report = AllocationReport::new("t", rules, AllocationOutcome::default());
    assert_eq!(report.report_currencies(), vec!["USD", "AUD"]);
    assert!(report.bundle_summaries().is_empty());
  }

  #[test]
  fn test_summaries_numbered_by_position() {
    let catalog: Vec<_> = (0..12)
      .map(|i| lure(&format!("P{i}"), price_map([("USD", dec!(16)), ("AUD", dec!(23))])))
      .collect();
    let rules = BundleRules::default();
    let outcome = generate_bundles(&catalog, &rules).unwrap();
    let report = AllocationReport::new("t", rules, outcome)
      .with_elapsed(Duration::from_millis(3));

    let summaries = report.bundle_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].label, "BUNDLE-001");
    assert_eq!(summaries[1].label, "BUNDLE-002");
    assert_eq!(summaries[1].product_ids[0].as_str(), "P6");
    assert_eq!(summaries[0].totals.get("USD"), Some(&dec!(96)));
    assert_eq!(report.labeled_products().len(), 12);
    assert_eq!(report.elapsed, Duration::from_millis(3));
  }
}
