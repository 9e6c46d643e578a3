//! Retail Aggregator - paginated retailer listing crawler
//!
//! Walks every category of every configured retailer page by page, merges the
//! products into one in-memory store keyed by retailer, manufacturer and
//! model, and snapshots that store to disk.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::{AggregationError, Aggregator};
pub use domain::{Product, ProductPage, Retailer};
pub use infrastructure::{AppConfig, ProductStore};
