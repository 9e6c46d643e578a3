//! Retail Aggregator entry point
//!
//! Runs one aggregation pass: restore the previous snapshot, walk every
//! enabled retailer, upsert the result and write the snapshot back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use retail_aggregator::application::Aggregator;
use retail_aggregator::domain::Fetch;
use retail_aggregator::infrastructure::config::defaults;
use retail_aggregator::infrastructure::{
    AppConfig, HttpClient, JsonCodec, ProductStore, build_retailers, init_logging_with_config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var_os(defaults::CONFIG_PATH_ENV).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    init_logging_with_config(&config.logging)?;
    info!("🚀 Retail Aggregator starting");
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Configuration loaded from defaults and environment"),
    }
    info!(
        "Snapshot file: {}",
        config.snapshot.resolved_path().display()
    );

    let store = if config.snapshot.pretty {
        ProductStore::with_codec(JsonCodec::pretty())
    } else {
        ProductStore::new()
    };

    let snapshot_path = config.snapshot.resolved_path();
    if config.snapshot.restore_on_start {
        if snapshot_path.exists() {
            store
                .restore_from_path(&snapshot_path)
                .await
                .with_context(|| format!("Failed to restore {}", snapshot_path.display()))?;
            info!("📂 {} products restored", store.len().await);
        } else {
            info!("No snapshot at {}, starting empty", snapshot_path.display());
        }
    }

    let fetch: Arc<dyn Fetch> = Arc::new(HttpClient::new(config.http.clone())?);
    let mut retailers = build_retailers(&config.retailers, &fetch)
        .context("Failed to set up retailer adapters")?;
    if retailers.is_empty() {
        warn!("No retailer enabled, nothing to aggregate");
    }

    let aggregator = Aggregator::new(config.pagination.clone());
    let updated = aggregator
        .update_sources(&store, &mut retailers)
        .await
        .context("Aggregation failed, store left unchanged")?;
    info!("✅ {} products aggregated, {} stored", updated, store.len().await);

    store
        .dump_to_path(&snapshot_path)
        .await
        .with_context(|| format!("Failed to write {}", snapshot_path.display()))?;

    for product in store.find_all().await.iter().take(config.snapshot.summary_limit) {
        info!(
            "{:>10.2}  {} {} ({}) {}",
            product.price,
            product.manufacturer,
            product.model,
            product.retailer,
            product.product_url
        );
    }

    Ok(())
}
