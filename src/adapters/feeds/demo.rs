//! Demo Catalog - Built-in Sample Feed
//!
//! 24 synthetic lures cycling through six realistic price points, with a
//! small per-item drift so no two products are identical. Used by
//! `--demo` runs and benchmarks when no scraped feed is at hand.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::product::{price_map, Product};
use crate::ports::catalog::CatalogSource;

/// `(cost JPY, USD, AUD)` price points.
const BASE_PRICES: [(Decimal, Decimal, Decimal); 6] = [
    (dec!(800), dec!(14.5), dec!(21.8)),
    (dec!(820), dec!(14.8), dec!(22.1)),
    (dec!(850), dec!(15.2), dec!(22.5)),
    (dec!(880), dec!(15.5), dec!(23.0)),
    (dec!(900), dec!(16.0), dec!(23.5)),
    (dec!(920), dec!(16.5), dec!(24.0)),
];

/// Number of products in the demo catalog.
pub const DEMO_SIZE: usize = 24;

/// Build the demo catalog.
pub fn demo_catalog() -> Vec<Product> {
    (0..DEMO_SIZE)
        .map(|i| {
            let (cost, usd, aud) = BASE_PRICES[i % BASE_PRICES.len()];
            let step = Decimal::from(i);
            let mut product = Product::new(
                format!("P{}", 1000 + i),
                format!("Dummy Lure {}", i + 1),
                price_map([("USD", usd + step * dec!(0.1)), ("AUD", aud + step * dec!(0.15))]),
                Some(cost + step * dec!(0.5)),
            );
            product.name_jp = Some(format!("ダミールアー{}", i + 1));
            product
        })
        .collect()
}

/// Catalog source serving [`demo_catalog`].
#[derive(Debug, Default)]
pub struct DemoCatalogSource;

#[async_trait]
impl CatalogSource for DemoCatalogSource {
    async fn load_catalog(&self) -> anyhow::Result<Vec<Product>> {
        Ok(demo_catalog())
    }

    fn describe(&self) -> String {
        "demo".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_shape() {
        let catalog = demo_catalog();
        assert_eq!(catalog.len(), DEMO_SIZE);
        assert_eq!(catalog[0].id.as_str(), "P1000");
        assert_eq!(catalog[23].id.as_str(), "P1023");
        assert_eq!(catalog[7].cost, Some(dec!(823.5)));
        assert_eq!(catalog[7].price("USD"), Some(dec!(15.5)));
        assert_eq!(catalog[7].price("AUD"), Some(dec!(23.15)));
        assert_eq!(catalog[0].name_jp.as_deref(), Some("ダミールアー1"));
    }
}
