//! Metrics Adapters - Allocation Observability
//!
//! Exposes per-run allocation metrics in Prometheus text format. Runs are
//! one-shot batches, so metrics go to a file for a node-exporter textfile
//! collector rather than an HTTP endpoint.

pub mod prometheus;

pub use self::prometheus::{MetricsFileWriter, MetricsRegistry};
