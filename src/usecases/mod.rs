//! Use Cases Layer - Application Workflows
//!
//! Orchestrates domain logic with port interfaces. Each use case is a
//! self-contained operation.
//!
//! Use cases:
//! - `BundleRun`: load catalog, allocate bundles, write reports

pub mod bundle_run;

pub use bundle_run::BundleRun;
