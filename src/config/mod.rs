//! Configuration Module - TOML-based Run Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Every bundle threshold is externalized here; the domain layer only
//! sees the resulting `BundleRules`.

pub mod loader;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::rules::{BundleRules, MarginRule, SecondaryCurrencyRule};

/// Top-level configuration.
///
/// `AppConfig::default()` leaves the secondary and margin checks off, since
/// each is enabled by its own table. `BundleRules::default()` is the shipped
/// `config.toml` rule set with both on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Run identity and output location.
  #[serde(default)]
  pub run: RunConfig,
  /// Product feed location.
  #[serde(default)]
  pub catalog: CatalogConfig,
  /// Bundle rule thresholds.
  #[serde(default)]
  pub bundle: BundleConfig,
  /// Which reports to write.
  #[serde(default)]
  pub report: ReportConfig,
}

impl AppConfig {
  /// Build the domain rule set from the `[bundle]` table.
  pub fn bundle_rules(&self) -> BundleRules {
    let b = &self.bundle;
    BundleRules {
      lures_per_bundle: b.lures_per_bundle,
      reference_currency: b.reference_currency.clone(),
      min_usd_value: b.min_usd_value,
      target_yen_per_lure: b.target_yen_per_lure,
      cost_tolerance: b.cost_tolerance,
      secondary: b.secondary.as_ref().map(|s| SecondaryCurrencyRule {
        currency: s.currency.clone(),
        min_total: s.min_total,
      }),
      margin: b.margin.as_ref().map(|m| MarginRule {
        min_profit: m.min_profit,
        revenue_weight: m.revenue_weight,
        cost_to_reference_rate: m.cost_to_reference_rate,
      }),
    }
  }
}

/// Run identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
  /// Human-readable run name, echoed into reports.
  #[serde(default = "default_run_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Directory receiving every report file.
  #[serde(default = "default_output_dir")]
  pub output_dir: String,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      name: default_run_name(),
      log_level: default_log_level(),
      output_dir: default_output_dir(),
    }
  }
}

/// Product feed configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
  /// Path to a `.json` (array) or `.jsonl` (one record per line) feed.
  pub path: Option<String>,
}

/// Bundle rule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleConfig {
  /// Exact number of products per bundle.
  #[serde(default = "default_lures_per_bundle")]
  pub lures_per_bundle: usize,
  /// Currency driving the minimum-value check.
  #[serde(default = "default_reference_currency")]
  pub reference_currency: String,
  /// Minimum reference-currency total per bundle.
  #[serde(default = "default_min_usd_value")]
  pub min_usd_value: Decimal,
  /// Target average base cost per product.
  #[serde(default = "default_target_yen_per_lure")]
  pub target_yen_per_lure: Decimal,
  /// Allowed relative deviation from the target (0.10 = ±10%).
  #[serde(default = "default_cost_tolerance")]
  pub cost_tolerance: Decimal,
  /// Second-currency threshold; disabled when the table is absent.
  pub secondary: Option<SecondaryConfig>,
  /// Profit-margin threshold; disabled when the table is absent.
  pub margin: Option<MarginConfig>,
}

/// Optional checks stay off until their tables appear.
impl Default for BundleConfig {
  fn default() -> Self {
    Self {
      lures_per_bundle: default_lures_per_bundle(),
      reference_currency: default_reference_currency(),
      min_usd_value: default_min_usd_value(),
      target_yen_per_lure: default_target_yen_per_lure(),
      cost_tolerance: default_cost_tolerance(),
      secondary: None,
      margin: None,
    }
  }
}

/// `[bundle.secondary]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryConfig {
  #[serde(default = "default_secondary_currency")]
  pub currency: String,
  #[serde(default = "default_secondary_min_total")]
  pub min_total: Decimal,
}

/// `[bundle.margin]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MarginConfig {
  #[serde(default = "default_min_profit")]
  pub min_profit: Decimal,
  /// Share of the reference price kept after marketplace fees.
  #[serde(default = "default_revenue_weight")]
  pub revenue_weight: Decimal,
  /// Base cost to reference currency conversion factor.
  #[serde(default = "default_cost_to_reference_rate")]
  pub cost_to_reference_rate: Decimal,
}

/// Report output configuration.
///
/// File names are relative to `run.output_dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
  /// Write the bundle CSV report.
  #[serde(default = "default_true")]
  pub csv: bool,
  #[serde(default = "default_csv_file")]
  pub csv_file: String,
  /// Write the JSON report.
  #[serde(default = "default_true")]
  pub json: bool,
  #[serde(default = "default_json_file")]
  pub json_file: String,
  /// Write the flattened, one-row-per-product CSV.
  #[serde(default)]
  pub flattened: bool,
  #[serde(default = "default_flattened_file")]
  pub flattened_file: String,
  /// Write allocation metrics in Prometheus text format.
  #[serde(default = "default_true")]
  pub metrics: bool,
  #[serde(default = "default_metrics_file")]
  pub metrics_file: String,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      csv: true,
      csv_file: default_csv_file(),
      json: true,
      json_file: default_json_file(),
      flattened: false,
      flattened_file: default_flattened_file(),
      metrics: true,
      metrics_file: default_metrics_file(),
    }
  }
}

// Default value functions for serde

fn default_run_name() -> String {
  "lure-bundler".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_output_dir() -> String {
  "data".to_string()
}

fn default_lures_per_bundle() -> usize {
  6
}

fn default_reference_currency() -> String {
  "USD".to_string()
}

fn default_min_usd_value() -> Decimal {
  dec!(85)
}

fn default_target_yen_per_lure() -> Decimal {
  dec!(850)
}

fn default_cost_tolerance() -> Decimal {
  dec!(0.10)
}

fn default_secondary_currency() -> String {
  "AUD".to_string()
}

fn default_secondary_min_total() -> Decimal {
  dec!(120)
}

fn default_min_profit() -> Decimal {
  dec!(25)
}

fn default_revenue_weight() -> Decimal {
  dec!(0.85)
}

fn default_cost_to_reference_rate() -> Decimal {
  dec!(0.01)
}

fn default_true() -> bool {
  true
}

fn default_csv_file() -> String {
  "bundles_report.csv".to_string()
}

fn default_json_file() -> String {
  "bundles_report.json".to_string()
}

fn default_flattened_file() -> String {
  "bundles_flat.csv".to_string()
}

fn default_metrics_file() -> String {
  "metrics.prom".to_string()
}
