//! In-memory product store
//!
//! One mutex guards the whole key -> product map. Upsert, listing, dump and
//! the swap at the end of a restore take it exclusively, so readers never
//! observe half a batch. Restore reads and decodes its input before locking.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::product::Product;
use crate::domain::repositories::{ProductUpserter, StoreError};
use crate::infrastructure::snapshot_codec::{JsonCodec, ProductMap, SnapshotCodec};

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub struct ProductStore {
    products: Mutex<ProductMap>,
    codec: Box<dyn SnapshotCodec>,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    /// Create an empty store snapshotting as compact JSON
    pub fn new() -> Self {
        Self::with_codec(JsonCodec::new())
    }

    pub fn with_codec(codec: impl SnapshotCodec + 'static) -> Self {
        Self {
            products: Mutex::new(ProductMap::new()),
            codec: Box::new(codec),
        }
    }

    /// Insert or replace every product of the batch.
    ///
    /// New keys get `created_at = now`; existing keys keep theirs. Every
    /// product gets `updated_at = now`. Later duplicates in the batch win.
    pub async fn upsert(&self, products: Vec<Product>) {
        let mut stored = self.products.lock().await;
        let now = Utc::now();
        let incoming = products.len();

        for mut product in products {
            let key = product.key();
            product.created_at = stored
                .get(&key)
                .map_or(now, |existing| existing.created_at);
            product.updated_at = now;
            stored.insert(key, product);
        }

        debug!(
            "Upserted {} products ({} stored)",
            incoming,
            stored.len()
        );
    }

    /// All products ordered by ascending price, ties by derived key
    pub async fn find_all(&self) -> Vec<Product> {
        let stored = self.products.lock().await;
        let mut entries: Vec<(&String, &Product)> = stored.iter().collect();
        entries.sort_by(|(a_key, a), (b_key, b)| {
            a.price.total_cmp(&b.price).then_with(|| a_key.cmp(b_key))
        });
        entries.into_iter().map(|(_, product)| product.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.products.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.lock().await.is_empty()
    }

    /// Write the whole collection to `sink`
    pub async fn dump<W>(&self, sink: &mut W) -> Result<(), StoreError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let stored = self.products.lock().await;
        let bytes = self.codec.encode(&stored)?;
        sink.write_all(&bytes).await?;
        sink.flush().await?;
        debug!("Dumped {} products ({} bytes)", stored.len(), bytes.len());
        Ok(())
    }

    /// Replace the whole collection with the snapshot read from `source`.
    ///
    /// The stream is decoded completely before the swap; on any error the
    /// current contents stay untouched.
    pub async fn restore<R>(&self, source: &mut R) -> Result<(), StoreError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes).await?;
        let restored = self.codec.decode(&bytes)?;

        let mut stored = self.products.lock().await;
        debug!(
            "Restored {} products (replacing {})",
            restored.len(),
            stored.len()
        );
        *stored = restored;
        Ok(())
    }

    /// Dump to a file, written next to it first and renamed into place
    pub async fn dump_to_path(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = staging_path(path);
        if let Err(error) = self.write_and_rename(&staging, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", staging.display(), cleanup);
                }
            }
            return Err(error);
        }

        info!("Snapshot written to {}", path.display());
        Ok(())
    }

    async fn write_and_rename(&self, staging: &Path, path: &Path) -> Result<(), StoreError> {
        let mut file = tokio::fs::File::create(staging).await?;
        self.dump(&mut file).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(staging, path).await?;
        Ok(())
    }

    pub async fn restore_from_path(&self, path: &Path) -> Result<(), StoreError> {
        let mut file = tokio::fs::File::open(path).await?;
        self.restore(&mut file).await?;
        info!("Snapshot restored from {}", path.display());
        Ok(())
    }
}

/// Sibling of `path` unique to this process and call
fn staging_path(path: &Path) -> PathBuf {
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.{sequence}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[async_trait]
impl ProductUpserter for ProductStore {
    async fn upsert(&self, products: Vec<Product>) -> Result<(), StoreError> {
        Self::upsert(self, products).await;
        Ok(())
    }
}
