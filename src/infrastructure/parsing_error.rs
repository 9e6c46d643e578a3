//! Parsing error types for retailer listing markup
//!
//! Any of these aborts the page fetch it occurred in; the walker treats
//! them exactly like transport failures.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Could not parse price from '{raw}'")]
    InvalidPrice { raw: String },

    #[error("Could not parse current page from pagination: '{raw}'")]
    InvalidPagination { raw: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Product {index} on the page could not be parsed: {source}")]
    ProductItem {
        index: usize,
        #[source]
        source: Box<ParsingError>,
    },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a price error for the raw text that failed to parse
    pub fn invalid_price(raw: &str) -> Self {
        Self::InvalidPrice {
            raw: raw.trim().to_string(),
        }
    }

    /// Create a pagination error for an unreadable current-page marker
    pub fn invalid_pagination(raw: &str) -> Self {
        Self::InvalidPagination {
            raw: raw.trim().to_string(),
        }
    }

    /// Attach the item position on the page to a per-product failure
    pub fn at_item(self, index: usize) -> Self {
        Self::ProductItem {
            index,
            source: Box::new(self),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
