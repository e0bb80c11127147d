//! Feed Adapters - Priced Product Sources
//!
//! Implementations of the `CatalogSource` port. The scraping, translation
//! and pricing pipeline upstream writes a JSON/JSONL feed; these adapters
//! read it (or serve the built-in demo catalog).

pub mod demo;
pub mod json_catalog;

pub use demo::{demo_catalog, DemoCatalogSource};
pub use json_catalog::{JsonCatalogSource, ProductRecord};
