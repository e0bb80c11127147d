//! Domain errors for bundle allocation.
//!
//! Three families, kept apart so callers can tell them apart:
//! - [`AllocationError`]: fatal. Bad rules (rejected before any work) or a
//!   broken allocator invariant (the run aborts).
//! - [`RuleViolation`]: why a candidate bundle failed the validity predicate.
//!   Never fatal, the allocator just moves on.
//! - [`ExclusionReason`]: why a catalog product was dropped before allocation.
//!   Recorded per product and reported next to the leftovers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal allocation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// A rule parameter is out of range.
    #[error("invalid bundle rule `{field}`: {reason}")]
    InvalidRules {
        /// Name of the offending parameter.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A committed bundle broke the allocator's contract.
    #[error("allocator invariant violated in bundle #{bundle}: {reason}")]
    InvariantViolation {
        /// 1-based output position of the bundle.
        bundle: usize,
        /// What went wrong.
        reason: String,
    },
}

/// The first check a candidate bundle failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("bundle is empty")]
    Empty,

    #[error("product {id} has no {currency} price")]
    MissingPrice { id: String, currency: String },

    #[error("product {id} has no usable cost")]
    MissingCost { id: String },

    #[error("{currency} total {total} below minimum {minimum}")]
    ReferenceBelowMinimum {
        currency: String,
        total: Decimal,
        minimum: Decimal,
    },

    #[error("average cost {average} outside [{low}, {high}]")]
    AverageCostOutOfRange {
        average: Decimal,
        low: Decimal,
        high: Decimal,
    },

    #[error("{currency} total {total} below secondary minimum {minimum}")]
    SecondaryBelowMinimum {
        currency: String,
        total: Decimal,
        minimum: Decimal,
    },

    #[error("profit margin {margin} below minimum {minimum}")]
    MarginBelowMinimum { margin: Decimal, minimum: Decimal },

    #[error("{quantity} overflows decimal range")]
    Overflow { quantity: &'static str },
}

/// Why a product was kept out of the working pool.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    #[error("missing {currency} price")]
    MissingReferencePrice { currency: String },

    #[error("missing {currency} price required by secondary threshold")]
    MissingSecondaryPrice { currency: String },

    #[error("negative {currency} price {price}")]
    NegativePrice { currency: String, price: Decimal },

    #[error("missing cost")]
    MissingCost,

    #[error("non-positive cost {cost}")]
    NonPositiveCost { cost: Decimal },

    #[error("duplicate product id")]
    DuplicateId,

    #[error("value ratio of price {price} over cost {cost} is out of range")]
    UnrankableValue { price: Decimal, cost: Decimal },
}

impl ExclusionReason {
    /// Stable snake_case name, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingReferencePrice { .. } => "missing_reference_price",
            Self::MissingSecondaryPrice { .. } => "missing_secondary_price",
            Self::NegativePrice { .. } => "negative_price",
            Self::MissingCost => "missing_cost",
            Self::NonPositiveCost { .. } => "non_positive_cost",
            Self::DuplicateId => "duplicate_id",
            Self::UnrankableValue { .. } => "unrankable_value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invalid_rules_message() {
        let err = AllocationError::InvalidRules {
            field: "lures_per_bundle",
            reason: "must be at least 2, got 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid bundle rule `lures_per_bundle`: must be at least 2, got 1"
        );
    }

    #[test]
    fn test_exclusion_reason_serializes_tagged() {
        let reason = ExclusionReason::NonPositiveCost { cost: dec!(0) };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], reason.kind());
        assert_eq!(ExclusionReason::DuplicateId.kind(), "duplicate_id");
    }

    #[test]
    fn test_unrankable_value_kind_matches_tag() {
        let reason = ExclusionReason::UnrankableValue {
            price: dec!(50000000000000000000000000000),
            cost: dec!(0.0001),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "unrankable_value");
        assert_eq!(reason.kind(), "unrankable_value");
    }
}
