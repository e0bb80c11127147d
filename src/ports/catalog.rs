//! Catalog Port - Priced Product Feed Interface
//!
//! The allocator needs a fully priced, finalized catalog before it runs.
//! Scraping, translation and currency conversion all happen behind this
//! trait, upstream of the bundling core.

use async_trait::async_trait;

use crate::domain::product::Product;

/// Trait for priced product feed providers.
///
/// Implementors must return the complete catalog in one call; the
/// allocator never sees a partially loaded feed.
#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
  /// Load every product in the feed, in feed order.
  async fn load_catalog(&self) -> anyhow::Result<Vec<Product>>;

  /// Short description of the source for logs (path, "demo", ...).
  fn describe(&self) -> String;
}
