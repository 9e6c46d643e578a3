//! Repository interfaces for aggregated products
//!
//! The aggregation pipeline only needs a bulk upsert; the in-memory store in
//! the infrastructure layer implements it, tests substitute recorders.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::Product;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot codec '{codec}' failed: {source}")]
    Codec {
        codec: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap an encoder/decoder failure with the codec's name
    pub fn codec(
        codec: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Codec {
            codec,
            source: source.into(),
        }
    }
}

#[async_trait]
pub trait ProductUpserter: Send + Sync {
    /// Insert or update every product of the batch in one step
    async fn upsert(&self, products: Vec<Product>) -> Result<(), StoreError>;
}
