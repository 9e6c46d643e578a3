//! Retailer adapters
//!
//! Each submodule implements [`Retailer`] for one shop. `build_retailers`
//! turns the configuration into the adapter list handed to the aggregator.

pub mod musik_produktiv;

use std::sync::Arc;

use tracing::info;

use crate::domain::retailer::{Fetch, Retailer};
use crate::infrastructure::config::RetailersConfig;
use crate::infrastructure::parsing_error::ParsingResult;

pub use musik_produktiv::MusikProduktiv;

/// Instantiate every enabled adapter, sharing one fetch capability
pub fn build_retailers(
    config: &RetailersConfig,
    fetch: &Arc<dyn Fetch>,
) -> ParsingResult<Vec<Box<dyn Retailer>>> {
    let mut retailers: Vec<Box<dyn Retailer>> = Vec::new();

    if config.musik_produktiv.enabled {
        retailers.push(Box::new(MusikProduktiv::new(
            Arc::clone(fetch),
            config.musik_produktiv.clone(),
        )?));
    }

    info!("{} retailer adapter(s) enabled", retailers.len());
    Ok(retailers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};

    #[test]
    fn test_build_respects_enabled_flag() {
        let fetch: Arc<dyn Fetch> = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());

        let mut config = RetailersConfig::default();
        let retailers = build_retailers(&config, &fetch).unwrap();
        assert_eq!(retailers.len(), 1);
        assert_eq!(retailers[0].name(), musik_produktiv::RETAILER_NAME);
        assert_eq!(retailers[0].categories(), config.musik_produktiv.categories);

        config.musik_produktiv.enabled = false;
        assert!(build_retailers(&config, &fetch).unwrap().is_empty());
    }
}
