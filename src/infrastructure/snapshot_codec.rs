//! Snapshot encoders for the product store
//!
//! The store hands its whole key -> product map to a [`SnapshotCodec`]; the
//! codec decides the byte format.

use std::collections::{BTreeMap, HashMap};

use crate::domain::product::Product;
use crate::domain::repositories::StoreError;

pub type ProductMap = HashMap<String, Product>;

pub trait SnapshotCodec: Send + Sync {
    /// Short name used in error messages
    fn name(&self) -> &'static str;

    fn encode(&self, products: &ProductMap) -> Result<Vec<u8>, StoreError>;

    /// Decode a complete snapshot; a malformed input must not yield a partial map
    fn decode(&self, bytes: &[u8]) -> Result<ProductMap, StoreError>;
}

/// JSON object keyed by derived product key, keys in sorted order
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl SnapshotCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, products: &ProductMap) -> Result<Vec<u8>, StoreError> {
        let ordered: BTreeMap<&String, &Product> = products.iter().collect();
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&ordered)
        } else {
            serde_json::to_vec(&ordered)
        };
        encoded.map_err(|e| StoreError::codec(self.name(), e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ProductMap, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::codec(self.name(), e))
    }
}
