//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    lures_per_bundle = config.bundle.lures_per_bundle,
    min_usd_value = %config.bundle.min_usd_value,
    target_yen_per_lure = %config.bundle.target_yen_per_lure,
    secondary = config.bundle.secondary.is_some(),
    margin = config.bundle.margin.is_some(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty run metadata and report file names
/// - Bundle rule ranges (delegated to `BundleRules::validate`)
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.run.output_dir.trim().is_empty(),
    "run.output_dir must not be empty"
  );
  anyhow::ensure!(
    !config.run.log_level.trim().is_empty(),
    "run.log_level must not be empty"
  );

  if let Some(path) = &config.catalog.path {
    anyhow::ensure!(!path.trim().is_empty(), "catalog.path must not be empty when set");
  }

  let report = &config.report;
  for (enabled, name, field) in [
    (report.csv, &report.csv_file, "report.csv_file"),
    (report.json, &report.json_file, "report.json_file"),
    (report.flattened, &report.flattened_file, "report.flattened_file"),
    (report.metrics, &report.metrics_file, "report.metrics_file"),
  ] {
    anyhow::ensure!(
      !enabled || !name.trim().is_empty(),
      "{} must not be empty when the report is enabled",
      field
    );
  }

  config
    .bundle_rules()
    .validate()
    .context("Invalid [bundle] configuration")?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::rules::BundleRules;
  use rust_decimal_macros::dec;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.bundle.lures_per_bundle, 6);
    assert_eq!(config.bundle.min_usd_value, dec!(85));
    assert!(config.bundle.secondary.is_none());
    assert!(config.bundle.margin.is_none());
    assert!(config.report.csv);
    assert!(!config.report.flattened);
    assert_eq!(config.run.output_dir, "data");
  }

  #[test]
  fn test_empty_optional_tables_match_rule_defaults() {
    let config = parse_config("[bundle.secondary]\n[bundle.margin]\n").unwrap();
    assert_eq!(config.bundle_rules(), BundleRules::default());
  }

  #[test]
  fn test_shipped_config_matches_rule_defaults() {
    let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
    assert_eq!(config.bundle_rules(), BundleRules::default());
  }

  #[test]
  fn test_default_config_disables_optional_checks() {
    let rules = AppConfig::default().bundle_rules();
    assert!(rules.secondary.is_none());
    assert!(rules.margin.is_none());
    assert_eq!(
      BundleRules { secondary: None, margin: None, ..BundleRules::default() },
      rules
    );
  }

  #[test]
  fn test_full_bundle_table() {
    let config = parse_config(
      r#"
        [bundle]
        lures_per_bundle = 4
        min_usd_value = 60.5
        target_yen_per_lure = 900
        cost_tolerance = 0.2

        [bundle.secondary]
        currency = "CAD"
        min_total = 80

        [bundle.margin]
        min_profit = 10
      "#,
    )
    .unwrap();

    let rules = config.bundle_rules();
    assert_eq!(rules.lures_per_bundle, 4);
    assert_eq!(rules.min_usd_value, dec!(60.5));
    assert_eq!(rules.cost_band(), (dec!(720), dec!(1080)));
    let secondary = rules.secondary.unwrap();
    assert_eq!(secondary.currency, "CAD");
    assert_eq!(secondary.min_total, dec!(80));
    let margin = rules.margin.unwrap();
    assert_eq!(margin.min_profit, dec!(10));
    assert_eq!(margin.revenue_weight, dec!(0.85));
  }

  #[test]
  fn test_invalid_bundle_size_rejected() {
    let err = parse_config("[bundle]\nlures_per_bundle = 1\n").unwrap_err();
    assert!(format!("{err:#}").contains("lures_per_bundle"));
  }

  #[test]
  fn test_negative_threshold_rejected() {
    assert!(parse_config("[bundle]\nmin_usd_value = -5\n").is_err());
  }

  #[test]
  fn test_enabled_report_needs_file_name() {
    assert!(parse_config("[report]\nflattened = true\nflattened_file = \"\"\n").is_err());
    assert!(parse_config("[report]\nflattened = false\nflattened_file = \"\"\n").is_ok());
  }
}
