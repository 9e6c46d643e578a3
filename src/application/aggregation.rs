//! Pagination walks and aggregation across retailers
//!
//! Everything here is sequential: adapters may carry state from one fetch to
//! the next and output order must follow category order. The first failure
//! aborts the whole run and nothing reaches the store.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::product::Product;
use crate::domain::repositories::{ProductUpserter, StoreError};
use crate::domain::retailer::{ProductPage, Retailer, RetailerError};
use crate::infrastructure::config::PaginationConfig;

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Could not load page {page} of category '{category}' from {retailer}: {source}")]
    Retailer {
        retailer: String,
        category: String,
        page: u32,
        #[source]
        source: RetailerError,
    },

    #[error("Category '{category}' of {retailer} still reports more pages after {limit} pages")]
    PageLimitExceeded {
        retailer: String,
        category: String,
        limit: u32,
    },

    #[error("Could not store aggregated products: {0}")]
    Store(#[from] StoreError),
}

/// Drives retailer adapters through their categories and pages
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: PaginationConfig,
}

impl Aggregator {
    pub const fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    /// Fetch every page of one category, in page order.
    ///
    /// Stops once the page counter reaches the last page reported by the
    /// latest response. Any failure discards the pages already fetched.
    pub async fn walk_category(
        &self,
        retailer: &mut dyn Retailer,
        category: &str,
    ) -> Result<Vec<Product>, AggregationError> {
        let mut page = 1;
        let first = Self::fetch(retailer, category, page).await?;
        let mut last_page = first.last_page;
        let mut products = first.products;

        while page < last_page {
            if page >= self.config.max_pages_per_category {
                return Err(AggregationError::PageLimitExceeded {
                    retailer: retailer.name().to_string(),
                    category: category.to_string(),
                    limit: self.config.max_pages_per_category,
                });
            }

            page += 1;
            let response = Self::fetch(retailer, category, page).await?;
            if response.current_page != page {
                warn!(
                    "{} reported page {} for requested page {} of '{}'",
                    retailer.name(),
                    response.current_page,
                    page,
                    category
                );
            }
            last_page = response.last_page;
            products.extend(response.products);
        }

        debug!(
            "Walked '{}' of {}: {} pages, {} products",
            category,
            retailer.name(),
            page,
            products.len()
        );
        Ok(products)
    }

    /// Walk every category of one retailer, in the order it lists them
    pub async fn load_products(
        &self,
        retailer: &mut dyn Retailer,
    ) -> Result<Vec<Product>, AggregationError> {
        let mut products = Vec::new();
        for category in retailer.categories() {
            let category_products = self.walk_category(retailer, &category).await?;
            products.extend(category_products);
        }

        info!("Loaded {} products from {}", products.len(), retailer.name());
        Ok(products)
    }

    /// Load every retailer and hand the combined result to one upsert.
    ///
    /// Returns the number of products upserted. Fails without touching the
    /// store if any retailer fails.
    pub async fn update_sources<S>(
        &self,
        store: &S,
        retailers: &mut [Box<dyn Retailer>],
    ) -> Result<usize, AggregationError>
    where
        S: ProductUpserter + ?Sized,
    {
        let mut products = Vec::new();
        for retailer in retailers.iter_mut() {
            let retailer_products = self.load_products(retailer.as_mut()).await?;
            products.extend(retailer_products);
        }

        let count = products.len();
        store.upsert(products).await?;

        info!(
            "Updated store with {} products from {} retailer(s)",
            count,
            retailers.len()
        );
        Ok(count)
    }

    async fn fetch(
        retailer: &mut dyn Retailer,
        category: &str,
        page: u32,
    ) -> Result<ProductPage, AggregationError> {
        debug!("Fetching page {} of '{}' from {}", page, category, retailer.name());
        retailer
            .fetch_page(category, page)
            .await
            .map_err(|source| AggregationError::Retailer {
                retailer: retailer.name().to_string(),
                category: category.to_string(),
                page,
                source,
            })
    }
}
