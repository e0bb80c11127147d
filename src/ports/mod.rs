//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `CatalogSource`: where the priced product feed comes from
//! - `ReportSink`: where allocation results are written

pub mod catalog;
pub mod report;
