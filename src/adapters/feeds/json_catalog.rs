//! JSON Catalog Feed - File-based Priced Product Source
//!
//! Reads the priced product feed produced by the upstream scrape/translate/
//! price pipeline. Two layouts are accepted, chosen by file extension:
//! - `.jsonl` / `.ndjson`: one record per line. Malformed lines are skipped
//!   with a warning, so one bad record cannot sink the run.
//! - anything else: a single JSON array of records. A parse failure is fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::domain::product::{Product, ProductId};
use crate::ports::catalog::CatalogSource;

/// Loosely-typed feed record, converted to a `Product` at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub name_en: Option<String>,
    pub name_jp: Option<String>,
    pub cost: Option<Decimal>,
    pub cost_currency: Option<String>,
    #[serde(default, alias = "price_map")]
    pub prices: BTreeMap<String, Decimal>,
    pub weight_g: Option<u32>,
    pub category: Option<String>,
}

impl ProductRecord {
    /// Convert into a `Product`, deriving the id from the title if needed.
    ///
    /// Returns `None` when the record has neither a usable id nor a title.
    pub fn into_product(self) -> Option<Product> {
        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ProductId::new)
            .or_else(|| {
                self.title
                    .as_deref()
                    .map(ProductId::from_title)
                    .filter(|id| !id.is_empty())
            })?;

        let name = self
            .name_en
            .or(self.title)
            .unwrap_or_else(|| id.to_string());

        let mut product = Product::new(id.as_str(), name, self.prices, self.cost);
        product.name_jp = self.name_jp;
        if let Some(currency) = self.cost_currency {
            product.cost_currency = currency;
        }
        if let Some(weight) = self.weight_g {
            product.weight_g = weight;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        Some(product)
    }
}

/// Catalog source backed by a JSON or JSONL file.
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_line_delimited(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("jsonl" | "ndjson")
        )
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_catalog(&self) -> Result<Vec<Product>> {
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read catalog file: {}", self.path.display()))?;

        let records = if self.is_line_delimited() {
            parse_lines(&self.path, &content)
        } else {
            serde_json::from_str::<Vec<ProductRecord>>(&content)
                .with_context(|| format!("Failed to parse catalog JSON: {}", self.path.display()))?
        };

        let total = records.len();
        let mut products = Vec::with_capacity(total);
        for (i, record) in records.into_iter().enumerate() {
            match record.into_product() {
                Some(product) => products.push(product),
                None => warn!(record = i, "Skipping catalog record without id or title"),
            }
        }

        info!(
            records = total,
            products = products.len(),
            "Catalog loaded"
        );
        Ok(products)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn parse_lines(path: &Path, content: &str) -> Vec<ProductRecord> {
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ProductRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed catalog record"
                );
            }
        }
    }
    records
}
