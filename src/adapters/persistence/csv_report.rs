//! CSV Report Writer
//!
//! Two layouts:
//! - `Bundles`: one row per bundle, a blank separator row, a
//!   `Leftover Products` header row, then one row per leftover.
//! - `Flattened`: one row per product, tagged with its bundle label or
//!   `leftover`.
//!
//! Money columns are rounded to 2 decimal places.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::write_atomic;
use crate::ports::report::{AllocationReport, ReportSink};

/// Which CSV shape to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    Bundles,
    Flattened,
}

/// CSV report sink.
pub struct CsvReportWriter {
    path: PathBuf,
    layout: CsvLayout,
}

impl CsvReportWriter {
    pub fn new(path: impl Into<PathBuf>, layout: CsvLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    /// Render the report in this writer's layout.
    pub fn render(&self, report: &AllocationReport) -> Result<String> {
        let bytes = match self.layout {
            CsvLayout::Bundles => render_bundles(report)?,
            CsvLayout::Flattened => render_flattened(report)?,
        };
        String::from_utf8(bytes).context("CSV output was not UTF-8")
    }
}

#[async_trait]
impl ReportSink for CsvReportWriter {
    #[instrument(skip(self, report), fields(path = %self.path.display()))]
    async fn write_report(&self, report: &AllocationReport) -> Result<()> {
        let csv = self.render(report)?;
        write_atomic(&self.path, csv.as_bytes()).await?;
        info!(layout = ?self.layout, bytes = csv.len(), "CSV report written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        match self.layout {
            CsvLayout::Bundles => "csv",
            CsvLayout::Flattened => "flattened-csv",
        }
    }
}

/// Rows in one report differ in width, so records are not length-checked.
fn writer(buf: &mut Vec<u8>) -> csv::Writer<&mut Vec<u8>> {
    csv::WriterBuilder::new().flexible(true).from_writer(buf)
}

fn render_bundles(report: &AllocationReport) -> Result<Vec<u8>> {
    let currencies = report.report_currencies();
    let mut buf = Vec::new();

    {
        let mut out = writer(&mut buf);
        let mut header = vec!["Bundle ID".to_string(), "Product IDs".to_string()];
        header.extend(currencies.iter().map(|c| format!("Total {c}")));
        header.push("Average Cost".to_string());
        out.write_record(&header)?;

        for summary in report.bundle_summaries() {
            let ids: Vec<&str> = summary.product_ids.iter().map(|id| id.as_str()).collect();
            let mut row = vec![summary.label, ids.join(",")];
            row.extend(
                currencies
                    .iter()
                    .map(|c| summary.totals.get(c).map(|t| money(*t)).unwrap_or_default()),
            );
            row.push(money(summary.average_cost));
            out.write_record(&row)?;
        }
        out.flush().context("Failed to flush bundle rows")?;
    }

    // A zero-field record would be written as `""`, so the separator goes in raw.
    buf.push(b'\n');

    {
        let mut out = writer(&mut buf);
        out.write_record(["Leftover Products"])?;
        for product in &report.outcome.leftovers {
            let cost = product.cost.map(money).unwrap_or_default();
            out.write_record([product.id.as_str(), product.name.as_str(), cost.as_str()])?;
        }
        out.flush().context("Failed to flush leftover rows")?;
    }

    Ok(buf)
}

fn render_flattened(report: &AllocationReport) -> Result<Vec<u8>> {
    let reference = &report.rules.reference_currency;
    let mut buf = Vec::new();

    {
        let mut out = writer(&mut buf);
        out.write_record(["Label", "Product ID", "Name", "Cost", reference.as_str()])?;

        for labeled in report.labeled_products() {
            let product = &labeled.product;
            let cost = product.cost.map(money).unwrap_or_default();
            let price = product.price(reference).map(money).unwrap_or_default();
            out.write_record([
                labeled.label.as_str(),
                product.id.as_str(),
                product.name.as_str(),
                cost.as_str(),
                price.as_str(),
            ])?;
        }
        out.flush().context("Failed to flush flattened rows")?;
    }

    Ok(buf)
}

fn money(value: Decimal) -> String {
    value.round_dp(2).normalize().to_string()
}
