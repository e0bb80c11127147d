//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! file-based infrastructure. Each sub-module groups adapters by concern.
//!
//! Adapter categories:
//! - `feeds`: JSON/JSONL product feed reader and the demo catalog
//! - `metrics`: Prometheus allocation metrics, exported as a text file
//! - `persistence`: CSV and JSON report writers

pub mod feeds;
pub mod metrics;
pub mod persistence;
