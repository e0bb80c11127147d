//! Committed bundles and the flattened labelled view.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::{Product, ProductId};
use super::rules::{checked_sum, BundleRules};

/// Tag given to unbundled products in the flattened view.
pub const LEFTOVER_LABEL: &str = "leftover";

/// Sequence label for the bundle at 1-based output `position`.
pub fn bundle_label(position: usize) -> String {
    format!("BUNDLE-{position:03}")
}

/// A fixed-size group of distinct products that passed the rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Members in the order they were placed.
    pub products: Vec<Product>,
    /// Total per currency priced on every member.
    pub totals: BTreeMap<String, Decimal>,
    /// Mean base cost across members.
    pub average_cost: Decimal,
    /// Aggregate margin, when the margin rule is enabled.
    pub margin: Option<Decimal>,
}

impl Bundle {
    /// Build a bundle and its aggregates from validated members.
    pub(crate) fn from_members(members: &[&Product], rules: &BundleRules) -> Self {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        if let Some((first, rest)) = members.split_first() {
            for currency in first.prices.keys() {
                if !rest.iter().all(|p| p.prices.contains_key(currency)) {
                    continue;
                }
                // Currencies outside the rules can still overflow; leave them untotalled.
                if let Some(total) = checked_sum(members.iter().filter_map(|p| p.price(currency))) {
                    totals.insert(currency.clone(), total);
                }
            }
        }

        let average_cost = checked_sum(members.iter().filter_map(|p| p.usable_cost()))
            .and_then(|total| total.checked_div(Decimal::from(members.len())))
            .unwrap_or_default();

        Self {
            products: members.iter().map(|p| (*p).clone()).collect(),
            totals,
            average_cost,
            margin: rules.margin(members),
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn total(&self, currency: &str) -> Option<Decimal> {
        self.totals.get(currency).copied()
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.products.iter().map(|p| &p.id)
    }

    /// Member references, in the shape the rule predicate takes.
    pub fn members(&self) -> Vec<&Product> {
        self.products.iter().collect()
    }
}

/// A product tagged with its bundle label or [`LEFTOVER_LABEL`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledProduct {
    pub label: String,
    pub product: Product,
}

impl LabeledProduct {
    pub fn is_leftover(&self) -> bool {
        self.label == LEFTOVER_LABEL
    }
}

/// Flatten `(bundles, leftovers)` into one labelled sequence.
///
/// Bundled products come first in bundle order, then leftovers.
pub fn flatten(bundles: &[Bundle], leftovers: &[Product]) -> Vec<LabeledProduct> {
    let bundled = bundles.iter().enumerate().flat_map(|(i, bundle)| {
        let label = bundle_label(i + 1);
        bundle.products.iter().map(move |p| LabeledProduct {
            label: label.clone(),
            product: p.clone(),
        })
    });

    let unbundled = leftovers.iter().map(|p| LabeledProduct {
        label: LEFTOVER_LABEL.to_string(),
        product: p.clone(),
    });

    bundled.chain(unbundled).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::price_map;
    use rust_decimal_macros::dec;

    fn lure(id: &str, prices: &[(&str, Decimal)], cost: Decimal) -> Product {
        Product::new(id, id, price_map(prices.iter().copied()), Some(cost))
    }

    #[test]
    fn test_label_format() {
        assert_eq!(bundle_label(1), "BUNDLE-001");
        assert_eq!(bundle_label(42), "BUNDLE-042");
        assert_eq!(bundle_label(1234), "BUNDLE-1234");
    }

    #[test]
    fn test_totals_only_cover_shared_currencies() {
        let a = lure("A", &[("USD", dec!(10)), ("AUD", dec!(15))], dec!(800));
        let b = lure("B", &[("USD", dec!(12))], dec!(900));
        let bundle = Bundle::from_members(&[&a, &b], &BundleRules::default());

        assert_eq!(bundle.total("USD"), Some(dec!(22)));
        assert_eq!(bundle.total("AUD"), None);
        assert_eq!(bundle.average_cost, dec!(850));
    }

    #[test]
    fn test_overflowing_side_currency_left_untotalled() {
        let huge = dec!(50000000000000000000000000000);
        let a = lure("A", &[("USD", dec!(10)), ("EUR", huge)], dec!(800));
        let b = lure("B", &[("USD", dec!(12)), ("EUR", huge)], dec!(900));
        let bundle = Bundle::from_members(&[&a, &b], &BundleRules::default());

        assert_eq!(bundle.total("USD"), Some(dec!(22)));
        assert_eq!(bundle.total("EUR"), None);
    }

    #[test]
    fn test_flatten_labels() {
        let a = lure("A", &[("USD", dec!(10))], dec!(800));
        let b = lure("B", &[("USD", dec!(10))], dec!(800));
        let c = lure("C", &[("USD", dec!(10))], dec!(800));
        let bundle = Bundle::from_members(&[&a, &b], &BundleRules::default());

        let flat = flatten(&[bundle], &[c]);
        let labels: Vec<_> = flat.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["BUNDLE-001", "BUNDLE-001", "leftover"]);
        assert!(flat[2].is_leftover());
        assert_eq!(flat[2].product.id.as_str(), "C");
    }
}
