//! Greedy bundle allocator.
//!
//! Packs a priced catalog into fixed-size bundles that satisfy
//! [`BundleRules`], leaving the rest as leftovers.
//!
//! Algorithm:
//! 1. Screen the catalog. Products missing required fields, or repeating an
//!    id already accepted, are excluded with a reason.
//! 2. Stable-sort the rest by `(reference_price / cost, reference_price)`,
//!    descending.
//! 3. Walk the sorted pool, appending to a working bundle. At full size the
//!    bundle commits if valid, otherwise the newest member is evicted.
//! 4. Whenever the working bundle is at least half full and already valid,
//!    backfill it with the cheapest unplaced products and commit if the
//!    result is still valid.
//! 5. Repeat the walk over the still-unplaced products, with a fresh working
//!    bundle, until a pass commits nothing. Leftovers are therefore a fixed
//!    point: allocating them again forms no bundle.
//! 6. Re-check every committed bundle; a failure is an invariant violation.
//!
//! Backfill draws from a min-heap keyed by `(cost, sort position)` with lazy
//! deletion, so each attempt costs O(k log n) rather than a catalog scan.
//!
//! The allocator holds no state between calls.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bundle::Bundle;
use super::error::{AllocationError, ExclusionReason};
use super::product::{Product, ProductId};
use super::rules::BundleRules;

/// A catalog product dropped before allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedProduct {
    pub product: Product,
    pub reason: ExclusionReason,
}

/// Counters describing one allocation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStats {
    /// Products in the input catalog.
    pub catalog_size: usize,
    /// Products that passed screening.
    pub accepted: usize,
    /// Items rolled back after completing an invalid bundle.
    pub evictions: usize,
    /// Backfills started on a valid partial bundle.
    pub backfill_attempts: usize,
    /// Backfills that produced a committed bundle.
    pub backfill_commits: usize,
    /// Backfills abandoned for lack of unplaced products.
    pub backfill_shortfalls: usize,
    /// Backfills whose filled bundle failed the rules.
    pub backfill_rejections: usize,
    /// Walks over the sorted pool, including the final one that committed nothing.
    #[serde(default)]
    pub passes: usize,
}

/// Result of a successful allocation run.
///
/// Every catalog product lands in exactly one of `bundles`, `leftovers`
/// or `excluded`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub bundles: Vec<Bundle>,
    /// Accepted products not placed in any bundle, in catalog order.
    pub leftovers: Vec<Product>,
    pub excluded: Vec<ExcludedProduct>,
    pub stats: AllocationStats,
}

impl AllocationOutcome {
    /// Split into the canonical `(bundles, leftovers)` pair.
    pub fn into_parts(self) -> (Vec<Bundle>, Vec<Product>) {
        (self.bundles, self.leftovers)
    }
}

/// Bundle allocator bound to a validated rule set.
#[derive(Debug, Clone)]
pub struct BundleAllocator {
    rules: BundleRules,
}

impl BundleAllocator {
    /// Create an allocator, rejecting invalid rules up front.
    pub fn new(rules: BundleRules) -> Result<Self, AllocationError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &BundleRules {
        &self.rules
    }

    /// Partition `catalog` into bundles, leftovers and exclusions.
    ///
    /// # Errors
    /// `InvariantViolation` if a committed bundle fails the final re-check.
    /// That would be an allocator bug, not bad input.
    pub fn generate_bundles(
        &self,
        catalog: &[Product],
    ) -> Result<AllocationOutcome, AllocationError> {
        let mut stats = AllocationStats {
            catalog_size: catalog.len(),
            ..AllocationStats::default()
        };

        if catalog.is_empty() {
            return Ok(AllocationOutcome {
                stats,
                ..AllocationOutcome::default()
            });
        }

        let (accepted, excluded) = self.screen(catalog);
        stats.accepted = accepted.len();

        let bundles = if accepted.len() < self.rules.lures_per_bundle {
            Vec::new()
        } else {
            let mut packing = Packing::new(&self.rules, &sort_by_value(accepted.clone()));
            packing.run();
            stats = AllocationStats {
                catalog_size: stats.catalog_size,
                accepted: stats.accepted,
                ..packing.stats
            };
            packing.bundles
        };

        let used = self.verify(&bundles)?;
        let leftovers = accepted
            .into_iter()
            .filter(|c| !used.contains(&c.product.id))
            .map(|c| c.product.clone())
            .collect();

        Ok(AllocationOutcome {
            bundles,
            leftovers,
            excluded,
            stats,
        })
    }

    /// Sort key for `product`, or why it cannot enter the working pool.
    fn rank<'a>(&self, product: &'a Product) -> Result<Candidate<'a>, ExclusionReason> {
        let reference = &self.rules.reference_currency;
        let Some(price) = product.price(reference) else {
            return Err(ExclusionReason::MissingReferencePrice {
                currency: reference.clone(),
            });
        };
        if let Some(secondary) = &self.rules.secondary {
            if product.price(&secondary.currency).is_none() {
                return Err(ExclusionReason::MissingSecondaryPrice {
                    currency: secondary.currency.clone(),
                });
            }
        }
        if let Some((currency, price)) = product.prices.iter().find(|(_, p)| **p < Decimal::ZERO) {
            return Err(ExclusionReason::NegativePrice {
                currency: currency.clone(),
                price: *price,
            });
        }
        let cost = match product.cost {
            None => return Err(ExclusionReason::MissingCost),
            Some(cost) if cost <= Decimal::ZERO => {
                return Err(ExclusionReason::NonPositiveCost { cost });
            }
            Some(cost) => cost,
        };
        let ratio = price
            .checked_div(cost)
            .ok_or(ExclusionReason::UnrankableValue { price, cost })?;
        Ok(Candidate {
            product,
            cost,
            key: (ratio, price),
        })
    }

    /// Split the catalog into ranked candidates and recorded exclusions.
    fn screen<'a>(&self, catalog: &'a [Product]) -> (Vec<Candidate<'a>>, Vec<ExcludedProduct>) {
        let mut seen: HashSet<&ProductId> = HashSet::with_capacity(catalog.len());
        let mut accepted = Vec::with_capacity(catalog.len());
        let mut excluded = Vec::new();

        for product in catalog {
            let ranked = self.rank(product).and_then(|candidate| {
                if seen.insert(&product.id) {
                    Ok(candidate)
                } else {
                    Err(ExclusionReason::DuplicateId)
                }
            });
            match ranked {
                Ok(candidate) => accepted.push(candidate),
                Err(reason) => excluded.push(ExcludedProduct {
                    product: product.clone(),
                    reason,
                }),
            }
        }

        (accepted, excluded)
    }

    /// Re-check committed bundles independently of the packing bookkeeping.
    ///
    /// Returns the ids of every bundled product.
    fn verify<'b>(&self, bundles: &'b [Bundle]) -> Result<HashSet<&'b ProductId>, AllocationError> {
        let mut used = HashSet::new();
        for (i, bundle) in bundles.iter().enumerate() {
            let violation = |reason: String| AllocationError::InvariantViolation {
                bundle: i + 1,
                reason,
            };

            if bundle.len() != self.rules.lures_per_bundle {
                return Err(violation(format!(
                    "has {} members, expected {}",
                    bundle.len(),
                    self.rules.lures_per_bundle
                )));
            }
            let mut local = HashSet::with_capacity(bundle.len());
            for id in bundle.product_ids() {
                if !local.insert(id) {
                    return Err(violation(format!("contains {id} twice")));
                }
                if !used.insert(id) {
                    return Err(violation(format!("reuses {id} from an earlier bundle")));
                }
            }
            self.rules
                .check(&bundle.members())
                .map_err(|v| violation(format!("fails re-validation: {v}")))?;
        }
        Ok(used)
    }
}

/// Run the allocator once with the given rules.
pub fn generate_bundles(
    catalog: &[Product],
    rules: &BundleRules,
) -> Result<AllocationOutcome, AllocationError> {
    BundleAllocator::new(rules.clone())?.generate_bundles(catalog)
}

/// An accepted product, its positive cost and its
/// `(value ratio, reference price)` sort key.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    product: &'a Product,
    cost: Decimal,
    key: (Decimal, Decimal),
}

/// Descending by sort key. Stable, so equal keys keep catalog order.
fn sort_by_value(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    candidates.sort_by(|a, b| b.key.cmp(&a.key));
    candidates
}

/// Mutable bookkeeping for the packing passes, indexed by sort position.
struct Packing<'a> {
    rules: &'a BundleRules,
    pool: Vec<&'a Product>,
    placed: Vec<bool>,
    in_working: Vec<bool>,
    working: Vec<usize>,
    /// Min-heap of `(cost, position)`. Placed entries are dropped lazily.
    cheapest: BinaryHeap<Reverse<(Decimal, usize)>>,
    bundles: Vec<Bundle>,
    stats: AllocationStats,
}

impl<'a> Packing<'a> {
    fn new(rules: &'a BundleRules, sorted: &[Candidate<'a>]) -> Self {
        let n = sorted.len();
        let pool = sorted.iter().map(|c| c.product).collect();
        let cheapest = sorted
            .iter()
            .enumerate()
            .map(|(pos, c)| Reverse((c.cost, pos)))
            .collect();
        Self {
            rules,
            pool,
            placed: vec![false; n],
            in_working: vec![false; n],
            working: Vec::with_capacity(rules.lures_per_bundle),
            cheapest,
            bundles: Vec::new(),
            stats: AllocationStats::default(),
        }
    }

    /// Run passes until one commits nothing.
    fn run(&mut self) {
        let size = self.rules.lures_per_bundle;
        loop {
            let unplaced = self.placed.iter().filter(|placed| !**placed).count();
            if unplaced < size {
                break;
            }
            self.stats.passes += 1;
            let committed = self.bundles.len();
            self.pass();
            if self.bundles.len() == committed {
                break;
            }
        }
    }

    /// One walk over the unplaced products in sort order.
    fn pass(&mut self) {
        let size = self.rules.lures_per_bundle;

        for pos in 0..self.pool.len() {
            if self.placed[pos] {
                continue;
            }

            self.working.push(pos);
            self.in_working[pos] = true;

            if self.working.len() == size {
                if self.is_valid(&self.working) {
                    let members = std::mem::take(&mut self.working);
                    self.commit(&members);
                } else {
                    self.working.pop();
                    self.in_working[pos] = false;
                    self.stats.evictions += 1;
                }
            }

            let len = self.working.len();
            if len > 0 && len < size && 2 * len >= size && self.is_valid(&self.working) {
                self.backfill();
            }
        }

        // An unfinished working bundle is dropped; its members stay unplaced.
        for pos in self.working.drain(..) {
            self.in_working[pos] = false;
        }
    }

    /// Top the working bundle up with the cheapest unplaced products.
    ///
    /// The working bundle is left untouched unless the filled bundle commits.
    fn backfill(&mut self) {
        self.stats.backfill_attempts += 1;
        let need = self.rules.lures_per_bundle - self.working.len();

        let mut fills = Vec::with_capacity(need);
        let mut held = Vec::new();
        while fills.len() < need {
            let Some(Reverse(entry)) = self.cheapest.pop() else {
                break;
            };
            let pos = entry.1;
            if self.placed[pos] {
                continue;
            }
            if self.in_working[pos] {
                held.push(entry);
            } else {
                fills.push(entry);
            }
        }
        self.cheapest.extend(held.into_iter().map(Reverse));

        if fills.len() < need {
            self.stats.backfill_shortfalls += 1;
            self.cheapest.extend(fills.into_iter().map(Reverse));
            return;
        }

        let mut candidate = self.working.clone();
        candidate.extend(fills.iter().map(|(_, pos)| *pos));

        if self.is_valid(&candidate) {
            self.stats.backfill_commits += 1;
            self.working.clear();
            self.commit(&candidate);
        } else {
            self.stats.backfill_rejections += 1;
            self.cheapest.extend(fills.into_iter().map(Reverse));
        }
    }

    fn commit(&mut self, positions: &[usize]) {
        for &pos in positions {
            self.placed[pos] = true;
            self.in_working[pos] = false;
        }
        let members = self.members(positions);
        self.bundles.push(Bundle::from_members(&members, self.rules));
    }

    fn is_valid(&self, positions: &[usize]) -> bool {
        self.rules.is_valid(&self.members(positions))
    }

    fn members(&self, positions: &[usize]) -> Vec<&'a Product> {
        positions.iter().map(|&pos| self.pool[pos]).collect()
    }
}
