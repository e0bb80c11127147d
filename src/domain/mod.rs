//! Domain layer - Bundle allocation core.
//!
//! Pure, synchronous logic: products, rules, bundles and the greedy
//! allocator. No I/O and no logging here; the usecases layer decides what
//! to report.

pub mod allocator;
pub mod bundle;
pub mod error;
pub mod product;
pub mod rules;

pub use allocator::{
    generate_bundles, AllocationOutcome, AllocationStats, BundleAllocator, ExcludedProduct,
};
pub use bundle::{bundle_label, flatten, Bundle, LabeledProduct, LEFTOVER_LABEL};
pub use error::{AllocationError, ExclusionReason, RuleViolation};
pub use product::{price_map, Product, ProductId};
pub use rules::{BundleRules, MarginRule, SecondaryCurrencyRule};
