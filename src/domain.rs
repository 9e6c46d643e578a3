//! Domain module - Core business entities and contracts
//!
//! This module contains the normalized product record, the source adapter
//! contract every retailer implements, and the storage port the aggregation
//! pipeline writes into.

pub mod product;
pub mod repositories;
pub mod retailer;

// Re-export commonly used items for convenience
pub use product::Product;
pub use repositories::{ProductUpserter, StoreError};
pub use retailer::{Fetch, FetchError, ProductPage, Retailer, RetailerError, TransportError};
