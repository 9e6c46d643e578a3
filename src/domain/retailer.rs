//! Source adapter contract
//!
//! Every retailer implements [`Retailer`]: it reports the categories it
//! lists and fetches one page of one category at a time. Adapters reach the
//! network only through the injected [`Fetch`] capability.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::Product;
use crate::infrastructure::parsing_error::ParsingError;

/// Underlying transport error, shared so [`FetchError`] stays `Clone`
pub type TransportError = Arc<dyn std::error::Error + Send + Sync>;

/// Transport failures reported by a [`Fetch`] implementation
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Failed to fetch URL {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("HTTP request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl FetchError {
    pub fn request(url: &str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Request {
            url: url.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn body(url: &str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Body {
            url: url.to_string(),
            source: Arc::new(source),
        }
    }
}

/// Anything that can go wrong while fetching a single listing page
#[derive(Error, Debug)]
pub enum RetailerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParsingError),
}

/// One page of one category as reported by an adapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub current_page: u32,
    pub last_page: u32,
}

impl ProductPage {
    pub const fn new(products: Vec<Product>, current_page: u32, last_page: u32) -> Self {
        Self {
            products,
            current_page,
            last_page,
        }
    }

    /// A category that fits on a single page
    pub const fn single(products: Vec<Product>) -> Self {
        Self::new(products, 1, 1)
    }
}

/// HTTP GET capability consumed by adapters.
///
/// Implementations return the full response body; the connection is released
/// before the call returns on every path.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Retailer-specific listing adapter.
///
/// `fetch_page` takes `&mut self`: adapters may memoize state derived from
/// earlier pages, so one instance is driven by one caller at a time.
#[async_trait]
pub trait Retailer: Send {
    /// Fixed literal written into every product's `retailer` field
    fn name(&self) -> &str;

    /// Category identifiers in walk order
    fn categories(&self) -> Vec<String>;

    /// Fetch one page (1-based) of a category.
    ///
    /// A single-page category must report `current_page == last_page == 1`.
    async fn fetch_page(&mut self, category: &str, page: u32)
    -> Result<ProductPage, RetailerError>;
}
