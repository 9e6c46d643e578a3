//! Infrastructure layer for HTTP access, retailer adapters and storage
//!
//! This module provides the fetch capability, the retailer-specific listing
//! parsers, the in-memory product store with its snapshot codecs, and the
//! configuration/logging setup used by the binary.

pub mod config; // Layered configuration and defaults
pub mod http_client;
pub mod logging;
pub mod parsing_error;
pub mod product_store;
pub mod retailers;
pub mod snapshot_codec;

// Re-export commonly used items
pub use config::AppConfig;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing_error::{ParsingError, ParsingResult};
pub use product_store::ProductStore;
pub use retailers::{MusikProduktiv, build_retailers};
pub use snapshot_codec::{JsonCodec, SnapshotCodec};
