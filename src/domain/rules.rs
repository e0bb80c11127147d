//! Bundle validity rules.
//!
//! A candidate bundle is valid when:
//!   Σ reference price             >= min_usd_value
//!   avg(cost)                     in target × [1 - tol, 1 + tol]
//!   Σ secondary price             >= secondary.min_total      (optional)
//!   Σ(ref × w - cost × rate)      >= margin.min_profit        (optional)
//!
//! Size is not part of the predicate: the allocator asks it
//! about partial bundles when deciding whether to backfill.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::{AllocationError, RuleViolation};
use super::product::Product;

/// Minimum total in a second currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryCurrencyRule {
    pub currency: String,
    pub min_total: Decimal,
}

impl Default for SecondaryCurrencyRule {
    fn default() -> Self {
        Self {
            currency: "AUD".to_string(),
            min_total: dec!(120),
        }
    }
}

/// Minimum aggregate profit margin, in the reference currency.
///
/// Per product: `reference_price × revenue_weight − cost × cost_to_reference_rate`.
/// The weight models marketplace fees, the rate converts base cost into the
/// reference currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginRule {
    pub min_profit: Decimal,
    pub revenue_weight: Decimal,
    pub cost_to_reference_rate: Decimal,
}

impl Default for MarginRule {
    fn default() -> Self {
        Self {
            min_profit: dec!(25),
            revenue_weight: dec!(0.85),
            cost_to_reference_rate: dec!(0.01),
        }
    }
}

/// The full, caller-configurable rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRules {
    /// Exact size of every committed bundle.
    pub lures_per_bundle: usize,
    /// Currency whose total drives the minimum-value check.
    pub reference_currency: String,
    /// Minimum reference-currency total per bundle.
    pub min_usd_value: Decimal,
    /// Target average base cost per product.
    pub target_yen_per_lure: Decimal,
    /// Allowed relative deviation of the average cost from the target.
    pub cost_tolerance: Decimal,
    /// Optional second-currency threshold.
    pub secondary: Option<SecondaryCurrencyRule>,
    /// Optional profit-margin threshold.
    pub margin: Option<MarginRule>,
}

impl Default for BundleRules {
    fn default() -> Self {
        Self {
            lures_per_bundle: 6,
            reference_currency: "USD".to_string(),
            min_usd_value: dec!(85),
            target_yen_per_lure: dec!(850),
            cost_tolerance: dec!(0.10),
            secondary: Some(SecondaryCurrencyRule::default()),
            margin: Some(MarginRule::default()),
        }
    }
}

impl BundleRules {
    /// Reject out-of-range parameters before any allocation work.
    pub fn validate(&self) -> Result<(), AllocationError> {
        let invalid = |field: &'static str, reason: String| {
            Err(AllocationError::InvalidRules { field, reason })
        };

        if self.lures_per_bundle < 2 {
            return invalid(
                "lures_per_bundle",
                format!("must be at least 2, got {}", self.lures_per_bundle),
            );
        }
        if self.reference_currency.trim().is_empty() {
            return invalid("reference_currency", "must not be empty".to_string());
        }
        if self.min_usd_value < Decimal::ZERO {
            return invalid(
                "min_usd_value",
                format!("must be non-negative, got {}", self.min_usd_value),
            );
        }
        if self.target_yen_per_lure <= Decimal::ZERO {
            return invalid(
                "target_yen_per_lure",
                format!("must be positive, got {}", self.target_yen_per_lure),
            );
        }
        if self.cost_tolerance < Decimal::ZERO || self.cost_tolerance >= Decimal::ONE {
            return invalid(
                "cost_tolerance",
                format!("must be in [0, 1), got {}", self.cost_tolerance),
            );
        }
        if let Some(secondary) = &self.secondary {
            if secondary.currency.trim().is_empty() {
                return invalid("secondary.currency", "must not be empty".to_string());
            }
            if secondary.min_total < Decimal::ZERO {
                return invalid(
                    "secondary.min_total",
                    format!("must be non-negative, got {}", secondary.min_total),
                );
            }
        }
        if let Some(margin) = &self.margin {
            if margin.revenue_weight < Decimal::ZERO {
                return invalid(
                    "margin.revenue_weight",
                    format!("must be non-negative, got {}", margin.revenue_weight),
                );
            }
            if margin.cost_to_reference_rate < Decimal::ZERO {
                return invalid(
                    "margin.cost_to_reference_rate",
                    format!(
                        "must be non-negative, got {}",
                        margin.cost_to_reference_rate
                    ),
                );
            }
        }
        Ok(())
    }

    /// Inclusive average-cost band. Saturates at the decimal range.
    pub fn cost_band(&self) -> (Decimal, Decimal) {
        let target = self.target_yen_per_lure;
        (
            target.saturating_mul(Decimal::ONE - self.cost_tolerance),
            target.saturating_mul(Decimal::ONE + self.cost_tolerance),
        )
    }

    /// Evaluate the predicate, reporting the first failed check.
    pub fn check(&self, members: &[&Product]) -> Result<(), RuleViolation> {
        if members.is_empty() {
            return Err(RuleViolation::Empty);
        }

        let mut reference_total = Decimal::ZERO;
        let mut cost_total = Decimal::ZERO;
        for product in members {
            reference_total = add(reference_total, self.reference_price(product)?, "reference total")?;
            cost_total = add(cost_total, usable_cost(product)?, "cost total")?;
        }

        if reference_total < self.min_usd_value {
            return Err(RuleViolation::ReferenceBelowMinimum {
                currency: self.reference_currency.clone(),
                total: reference_total,
                minimum: self.min_usd_value,
            });
        }

        let average = cost_total / Decimal::from(members.len());
        let (low, high) = self.cost_band();
        if average < low || average > high {
            return Err(RuleViolation::AverageCostOutOfRange { average, low, high });
        }

        if let Some(secondary) = &self.secondary {
            let mut total = Decimal::ZERO;
            for product in members {
                let price = product.price(&secondary.currency).ok_or_else(|| {
                    RuleViolation::MissingPrice {
                        id: product.id.to_string(),
                        currency: secondary.currency.clone(),
                    }
                })?;
                total = add(total, price, "secondary total")?;
            }
            if total < secondary.min_total {
                return Err(RuleViolation::SecondaryBelowMinimum {
                    currency: secondary.currency.clone(),
                    total,
                    minimum: secondary.min_total,
                });
            }
        }

        if let Some(rule) = &self.margin {
            let margin = self.margin_with(rule, members)?;
            if margin < rule.min_profit {
                return Err(RuleViolation::MarginBelowMinimum {
                    margin,
                    minimum: rule.min_profit,
                });
            }
        }

        Ok(())
    }

    /// `true` iff every enabled check passes. Never panics on bad data.
    pub fn is_valid(&self, members: &[&Product]) -> bool {
        self.check(members).is_ok()
    }

    /// Aggregate profit margin, when the margin rule is enabled and every
    /// member carries the fields it needs.
    pub fn margin(&self, members: &[&Product]) -> Option<Decimal> {
        let rule = self.margin.as_ref()?;
        self.margin_with(rule, members).ok()
    }

    fn margin_with(
        &self,
        rule: &MarginRule,
        members: &[&Product],
    ) -> Result<Decimal, RuleViolation> {
        let mut margin = Decimal::ZERO;
        for product in members {
            let revenue = mul(self.reference_price(product)?, rule.revenue_weight)?;
            let cost = mul(usable_cost(product)?, rule.cost_to_reference_rate)?;
            let profit = revenue
                .checked_sub(cost)
                .ok_or(RuleViolation::Overflow { quantity: "margin" })?;
            margin = add(margin, profit, "margin")?;
        }
        Ok(margin)
    }

    fn reference_price(&self, product: &Product) -> Result<Decimal, RuleViolation> {
        product
            .price(&self.reference_currency)
            .ok_or_else(|| RuleViolation::MissingPrice {
                id: product.id.to_string(),
                currency: self.reference_currency.clone(),
            })
    }
}

fn add(total: Decimal, value: Decimal, quantity: &'static str) -> Result<Decimal, RuleViolation> {
    total
        .checked_add(value)
        .ok_or(RuleViolation::Overflow { quantity })
}

fn mul(value: Decimal, factor: Decimal) -> Result<Decimal, RuleViolation> {
    value
        .checked_mul(factor)
        .ok_or(RuleViolation::Overflow { quantity: "margin" })
}

/// Sum that reports overflow instead of panicking.
pub(crate) fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

fn usable_cost(product: &Product) -> Result<Decimal, RuleViolation> {
    product.usable_cost().ok_or_else(|| RuleViolation::MissingCost {
        id: product.id.to_string(),
    })
}
