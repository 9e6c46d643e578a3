//! Application layer module
//!
//! Orchestrates retailer adapters: pagination walks, per-retailer loading
//! and the all-or-nothing store update.

pub mod aggregation;

pub use aggregation::{AggregationError, Aggregator};
