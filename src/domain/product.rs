//! Priced catalog products.
//!
//! A `Product` is built once at the feed boundary and never mutated.
//! Identity is the `ProductId` alone: two values with the same id are the
//! same catalog entry no matter what else differs.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog-unique product identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a human-readable title.
    ///
    /// Whitespace runs collapse to a single space and the ends are trimmed,
    /// so titles differing only in spacing map to the same id.
    pub fn from_title(title: &str) -> Self {
        Self(title.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A priced product from the upstream feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Display name (English when available).
    pub name: String,
    /// Original-language name as scraped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_jp: Option<String>,
    /// Unit price per currency code.
    pub prices: BTreeMap<String, Decimal>,
    /// Acquisition cost in `cost_currency`.
    pub cost: Option<Decimal>,
    /// ISO 4217 code of the cost.
    #[serde(default = "default_cost_currency")]
    pub cost_currency: String,
    /// Shipping weight in grams.
    #[serde(default = "default_weight_g")]
    pub weight_g: u32,
    /// Product category.
    #[serde(default = "default_category")]
    pub category: String,
}

impl Product {
    /// Create a product with the default descriptive fields.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        prices: BTreeMap<String, Decimal>,
        cost: Option<Decimal>,
    ) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            name_jp: None,
            prices,
            cost,
            cost_currency: default_cost_currency(),
            weight_g: default_weight_g(),
            category: default_category(),
        }
    }

    /// Create a product whose id is derived from its title.
    pub fn titled(
        title: &str,
        prices: BTreeMap<String, Decimal>,
        cost: Option<Decimal>,
    ) -> Self {
        let mut product = Self::new("", title, prices, cost);
        product.id = ProductId::from_title(title);
        product
    }

    /// Price in the given currency, if the feed supplied one.
    pub fn price(&self, currency: &str) -> Option<Decimal> {
        self.prices.get(currency).copied()
    }

    /// Cost, only when strictly positive.
    pub fn usable_cost(&self) -> Option<Decimal> {
        self.cost.filter(|c| *c > Decimal::ZERO)
    }

    /// Reference value earned per unit of acquisition cost.
    ///
    /// `None` when the reference price or a positive cost is missing.
    pub fn value_ratio(&self, reference_currency: &str) -> Option<Decimal> {
        let price = self.price(reference_currency)?;
        let cost = self.usable_cost()?;
        price.checked_div(cost)
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn default_cost_currency() -> String {
    "JPY".to_string()
}

fn default_weight_g() -> u32 {
    100
}

fn default_category() -> String {
    "lure".to_string()
}

/// Build a price map from `(currency, price)` pairs.
pub fn price_map<I, S>(pairs: I) -> BTreeMap<String, Decimal>
where
    I: IntoIterator<Item = (S, Decimal)>,
    S: Into<String>,
{
    pairs.into_iter().map(|(c, p)| (c.into(), p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn lure(id: &str, usd: Decimal, cost: Option<Decimal>) -> Product {
        Product::new(id, id, price_map([("USD", usd)]), cost)
    }

    #[test]
    fn test_equality_by_id_only() {
        let a = lure("P1", dec!(10), Some(dec!(800)));
        let b = lure("P1", dec!(99), None);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_id_from_title() {
        let p = Product::titled("  Jackall   Squad Minnow 95 ", price_map([("USD", dec!(15))]), None);
        assert_eq!(p.id.as_str(), "Jackall Squad Minnow 95");
        assert_eq!(p.name, "  Jackall   Squad Minnow 95 ");
    }

    #[test]
    fn test_value_ratio() {
        let p = lure("P1", dec!(17), Some(dec!(850)));
        assert_eq!(p.value_ratio("USD"), Some(dec!(0.02)));
    }

    #[test]
    fn test_value_ratio_undefined_without_cost() {
        assert_eq!(lure("P1", dec!(17), None).value_ratio("USD"), None);
        assert_eq!(lure("P1", dec!(17), Some(dec!(0))).value_ratio("USD"), None);
        assert_eq!(lure("P1", dec!(17), Some(dec!(850))).value_ratio("AUD"), None);
    }

    #[test]
    fn test_defaults() {
        let p = lure("P1", dec!(1), Some(dec!(1)));
        assert_eq!(p.cost_currency, "JPY");
        assert_eq!(p.weight_g, 100);
        assert_eq!(p.category, "lure");
    }
}
