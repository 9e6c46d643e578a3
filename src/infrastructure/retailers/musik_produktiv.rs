//! musik-produktiv.de listing adapter
//!
//! Listing pages carry a manufacturer filter menu; its entries are memoized
//! and used to split the combined "manufacturer model" label of each item.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::product::Product;
use crate::domain::retailer::{Fetch, ProductPage, Retailer, RetailerError};
use crate::infrastructure::config::MusikProduktivConfig;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Value of every product's `retailer` field
pub const RETAILER_NAME: &str = "Musik Produktiv";

/// Class of the availability light when the item is not in stock
const UNAVAILABLE_CLASS: &str = "zzz";

/// German price notation: "1.299,00", "459,-", "899"
const PRICE_PATTERN: &str = r"\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?";

/// Compiled selectors for a listing page
struct ListingSelectors {
    category_title: Selector,
    manufacturer_menu: Selector,
    manufacturer_entry: Selector,
    product_item: Selector,
    product_name: Selector,
    price: Selector,
    availability: Selector,
    link: Selector,
    thumbnail: Selector,
    pagination: Selector,
    pagination_current: Selector,
    pagination_link: Selector,
    price_pattern: Regex,
}

impl ListingSelectors {
    fn new() -> ParsingResult<Self> {
        Ok(Self {
            category_title: compile("div.list_title h1")?,
            manufacturer_menu: compile(".mp-filtermenu ul")?,
            manufacturer_entry: compile("li span")?,
            product_item: compile("ul.artgrid li")?,
            product_name: compile("b")?,
            price: compile("i")?,
            availability: compile(".ampel")?,
            link: compile("a[href]")?,
            thumbnail: compile("img")?,
            pagination: compile(".list_page div")?,
            pagination_current: compile(".list_page div div")?,
            pagination_link: compile(".list_page div a")?,
            price_pattern: Regex::new(PRICE_PATTERN).map_err(|e| {
                ParsingError::ConfigurationError {
                    message: format!("Invalid price pattern: {e}"),
                }
            })?,
        })
    }
}

fn compile(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub struct MusikProduktiv {
    fetch: Arc<dyn Fetch>,
    config: MusikProduktivConfig,
    selectors: ListingSelectors,
    /// Manufacturer names from the most recent page's filter menu
    manufacturers: Vec<String>,
}

impl MusikProduktiv {
    pub fn new(fetch: Arc<dyn Fetch>, config: MusikProduktivConfig) -> ParsingResult<Self> {
        Ok(Self {
            fetch,
            config,
            selectors: ListingSelectors::new()?,
            manufacturers: Vec::new(),
        })
    }

    /// Known manufacturers, filled by the first fetched page
    pub fn manufacturers(&self) -> &[String] {
        &self.manufacturers
    }

    /// `{base}/{category}` for the first page, `?p=N` afterwards
    pub fn listing_url(&self, category: &str, page: u32) -> String {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            category.trim_start_matches('/')
        );
        if page <= 1 {
            url
        } else if url.contains('?') {
            format!("{url}&p={page}")
        } else {
            format!("{url}?p={page}")
        }
    }

    /// Parse one listing page, refreshing the manufacturer list on the way
    pub fn parse_listing(&mut self, html: &str) -> ParsingResult<ProductPage> {
        let document = Html::parse_document(html);

        let category = document
            .select(&self.selectors.category_title)
            .next()
            .map(|title| element_text(&title))
            .unwrap_or_default();

        self.refresh_manufacturers(&document);

        let mut products = Vec::new();
        for (index, item) in document.select(&self.selectors.product_item).enumerate() {
            let mut product = self.parse_product(&item).map_err(|e| e.at_item(index))?;
            product.category.clone_from(&category);
            products.push(product);
        }

        let (current_page, last_page) = self.parse_pagination(&document)?;
        debug!(
            "Parsed {} products from '{}' (page {}/{})",
            products.len(),
            category,
            current_page,
            last_page
        );

        Ok(ProductPage::new(products, current_page, last_page))
    }

    fn refresh_manufacturers(&mut self, document: &Html) {
        let Some(menu) = document.select(&self.selectors.manufacturer_menu).next() else {
            return;
        };
        let manufacturers: Vec<String> = menu
            .select(&self.selectors.manufacturer_entry)
            .map(|entry| element_text(&entry))
            .filter(|name| !name.is_empty())
            .collect();
        if !manufacturers.is_empty() {
            self.manufacturers = manufacturers;
        }
    }

    fn parse_product(&self, item: &ElementRef) -> ParsingResult<Product> {
        let name = item
            .select(&self.selectors.product_name)
            .next()
            .map(|name| element_text(&name))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ParsingError::required_field_missing("product name", Some("b")))?;
        let (manufacturer, model) = self.split_product_name(&name);

        let raw_price = item
            .select(&self.selectors.price)
            .next()
            .map(|price| element_text(&price))
            .unwrap_or_default();
        let price = self.parse_price(&raw_price)?;

        let availability = item.select(&self.selectors.availability).next();
        let is_available = availability.is_none_or(|light| {
            !light.value().classes().any(|class| class == UNAVAILABLE_CLASS)
        });
        let availability_info = availability
            .map(|light| {
                light
                    .value()
                    .attr("title")
                    .map_or_else(|| element_text(&light), |title| title.trim().to_string())
            })
            .unwrap_or_default();

        let product_url = match item
            .select(&self.selectors.link)
            .next()
            .and_then(|link| link.value().attr("href"))
        {
            Some(href) => self.resolve_url(href)?,
            None => String::new(),
        };

        let thumbnail_url = match item.select(&self.selectors.thumbnail).next().and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
        }) {
            Some(src) => self.resolve_url(src)?,
            None => String::new(),
        };

        Ok(Product {
            retailer: RETAILER_NAME.to_string(),
            manufacturer,
            model,
            is_available,
            availability_info,
            price,
            product_url,
            thumbnail_url,
            ..Product::default()
        })
    }

    /// Split "Fender AM Pro II ..." into manufacturer and model.
    ///
    /// Longest known manufacturer that prefixes the name on a word boundary
    /// wins; otherwise the first word is taken as manufacturer.
    pub fn split_product_name(&self, name: &str) -> (String, String) {
        let name = name.trim();
        let known = self
            .manufacturers
            .iter()
            .filter(|manufacturer| {
                name.strip_prefix(manufacturer.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
            })
            .max_by_key(|manufacturer| manufacturer.len());

        if let Some(manufacturer) = known {
            return (
                manufacturer.clone(),
                name[manufacturer.len()..].trim_start().to_string(),
            );
        }

        if !self.manufacturers.is_empty() {
            warn!("No known manufacturer prefixes '{}'", name);
        }
        match name.split_once(' ') {
            Some((manufacturer, model)) => (manufacturer.to_string(), model.trim_start().to_string()),
            None => (name.to_string(), String::new()),
        }
    }

    /// Parse a German-formatted price, ignoring currency and surrounding text
    pub fn parse_price(&self, raw: &str) -> ParsingResult<f64> {
        let digits = self
            .selectors
            .price_pattern
            .find(raw)
            .ok_or_else(|| ParsingError::invalid_price(raw))?;
        digits
            .as_str()
            .replace('.', "")
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ParsingError::invalid_price(raw))
    }

    /// Current and last page from the pagination block.
    ///
    /// A missing or single-node block means the category has one page.
    fn parse_pagination(&self, document: &Html) -> ParsingResult<(u32, u32)> {
        if document.select(&self.selectors.pagination).count() <= 1 {
            return Ok((1, 1));
        }

        let raw_current = document
            .select(&self.selectors.pagination_current)
            .next()
            .map(|current| element_text(&current))
            .unwrap_or_default();
        let current_page: u32 = raw_current
            .parse()
            .map_err(|_| ParsingError::invalid_pagination(&raw_current))?;

        // "»"-style navigation links carry no number
        let last_page = document
            .select(&self.selectors.pagination_link)
            .filter_map(|link| element_text(&link).parse::<u32>().ok())
            .fold(current_page, u32::max);

        Ok((current_page, last_page))
    }

    fn resolve_url(&self, href: &str) -> ParsingResult<String> {
        let base = Url::parse(&self.config.base_url).map_err(|e| {
            ParsingError::UrlResolutionFailed {
                url: self.config.base_url.clone(),
                reason: format!("Invalid base URL: {e}"),
                base_url: None,
            }
        })?;
        base.join(href.trim())
            .map(String::from)
            .map_err(|e| ParsingError::UrlResolutionFailed {
                url: href.to_string(),
                reason: format!("Failed to join URL: {e}"),
                base_url: Some(self.config.base_url.clone()),
            })
    }
}

#[async_trait]
impl Retailer for MusikProduktiv {
    fn name(&self) -> &str {
        RETAILER_NAME
    }

    fn categories(&self) -> Vec<String> {
        self.config.categories.clone()
    }

    async fn fetch_page(
        &mut self,
        category: &str,
        page: u32,
    ) -> Result<ProductPage, RetailerError> {
        let url = self.listing_url(category, page);
        let body = self.fetch.get(&url).await?;
        Ok(self.parse_listing(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retailer::FetchError;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE_URL: &str = "https://www.musik-produktiv.de";

    const PAGE_ONE: &str = r#"
<html><body>
<div class="list_title"><h1>E-Gitarren für Linkshänder</h1></div>
<div class="mp-filtermenu">
  <ul>
    <li><span>Fender</span></li>
    <li><span>Gretsch</span></li>
    <li><span>Sterling by Music Man</span></li>
    <li><span>Sterling</span></li>
  </ul>
  <ul><li><span>Sunburst</span></li></ul>
</div>
<ul class="artgrid">
  <li>
    <a href="/fender-am-pro-ii-jazzmaster-lh-mn-mys.html">
      <img src="https://cdn.musik-produktiv.de/pic-100/fender-jazzmaster.jpg">
      <b>Fender AM Pro II Jazzmaster LH MN MYS</b>
      <i>1.999,00 €</i>
      <span class="ampel gruen" title="sofort lieferbar"></span>
    </a>
  </li>
  <li>
    <a href="/sterling-stingray-5-lh.html">
      <img data-src="/pic-100/stingray.jpg">
      <b>Sterling by Music Man StingRay 5 LH MN VSB</b>
      <i>ab 1.049,- €</i>
      <span class="ampel zzz" title="nicht auf Lager"></span>
    </a>
  </li>
</ul>
<div class="list_page"><div><div>1</div><a href="?p=2">2</a><a href="?p=3">3</a><a href="?p=2">»</a></div></div>
</body></html>
"#;

    const PAGE_THREE: &str = r#"
<html><body>
<div class="list_title"><h1>E-Gitarren für Linkshänder</h1></div>
<ul class="artgrid">
  <li>
    <a href="/gretsch-g2622lh.html"><b>Gretsch G2622LH Strml. DC CB Gunmetal</b><i>459,00 €</i></a>
  </li>
</ul>
<div class="list_page"><div><a href="?p=1">1</a><a href="?p=2">2</a><div>3</div></div></div>
</body></html>
"#;

    const SINGLE_PAGE: &str = r#"
<html><body>
<div class="list_title"><h1>Westerngitarren für Linkshänder</h1></div>
<ul class="artgrid">
  <li><a href="/yamaha-fg800l.html"><b>Yamaha FG800L</b><i>239 €</i></a></li>
</ul>
<div class="list_page"><div></div></div>
</body></html>
"#;

    /// Serves canned bodies by URL and records every request
    #[derive(Default)]
    struct ScriptedFetch {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn get(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn adapter(fetch: Arc<dyn Fetch>, categories: &[&str]) -> MusikProduktiv {
        MusikProduktiv::new(
            fetch,
            MusikProduktivConfig {
                enabled: true,
                base_url: BASE_URL.to_string(),
                categories: categories.iter().map(ToString::to_string).collect(),
            },
        )
        .unwrap()
    }

    fn offline_adapter() -> MusikProduktiv {
        adapter(Arc::new(ScriptedFetch::default()), &["e-gitarre-linkshaender"])
    }

    #[test]
    fn test_parse_listing_page() {
        let mut adapter = offline_adapter();
        let page = adapter.parse_listing(PAGE_ONE).unwrap();

        assert_eq!((page.current_page, page.last_page), (1, 3));
        assert_eq!(page.products.len(), 2);

        let jazzmaster = &page.products[0];
        assert_eq!(jazzmaster.retailer, RETAILER_NAME);
        assert_eq!(jazzmaster.manufacturer, "Fender");
        assert_eq!(jazzmaster.model, "AM Pro II Jazzmaster LH MN MYS");
        assert_eq!(jazzmaster.category, "E-Gitarren für Linkshänder");
        assert_eq!(jazzmaster.price, 1999.0);
        assert!(jazzmaster.is_available);
        assert_eq!(jazzmaster.availability_info, "sofort lieferbar");
        assert_eq!(
            jazzmaster.product_url,
            "https://www.musik-produktiv.de/fender-am-pro-ii-jazzmaster-lh-mn-mys.html"
        );
        assert_eq!(
            jazzmaster.thumbnail_url,
            "https://cdn.musik-produktiv.de/pic-100/fender-jazzmaster.jpg"
        );

        let stingray = &page.products[1];
        assert_eq!(stingray.manufacturer, "Sterling by Music Man");
        assert_eq!(stingray.model, "StingRay 5 LH MN VSB");
        assert_eq!(stingray.price, 1049.0);
        assert!(!stingray.is_available);
        assert_eq!(
            stingray.thumbnail_url,
            "https://www.musik-produktiv.de/pic-100/stingray.jpg"
        );
    }

    #[test]
    fn test_manufacturers_come_from_first_filter_list_only() {
        let mut adapter = offline_adapter();
        adapter.parse_listing(PAGE_ONE).unwrap();
        assert_eq!(
            adapter.manufacturers(),
            ["Fender", "Gretsch", "Sterling by Music Man", "Sterling"]
        );

        // pages without a filter menu keep the memoized list
        adapter.parse_listing(PAGE_THREE).unwrap();
        assert_eq!(adapter.manufacturers().len(), 4);
    }

    #[test]
    fn test_single_page_category() {
        let mut adapter = offline_adapter();
        let page = adapter.parse_listing(SINGLE_PAGE).unwrap();

        assert_eq!((page.current_page, page.last_page), (1, 1));
        assert_eq!(page.products[0].manufacturer, "Yamaha");
        assert_eq!(page.products[0].model, "FG800L");
        assert_eq!(page.products[0].price, 239.0);
    }

    #[test]
    fn test_missing_pagination_is_single_page() {
        let mut adapter = offline_adapter();
        let page = adapter
            .parse_listing(r#"<ul class="artgrid"><li><b>Ibanez GRG170DXL</b><i>299 €</i></li></ul>"#)
            .unwrap();
        assert_eq!((page.current_page, page.last_page), (1, 1));
        assert_eq!(page.products[0].product_url, "");
    }

    #[test]
    fn test_malformed_item_fails_the_page() {
        let mut adapter = offline_adapter();
        let html = r#"
<ul class="artgrid">
  <li><b>Fender Player Strat LH</b><i>799 €</i></li>
  <li><b>Gibson Les Paul LH</b><i>Preis auf Anfrage</i></li>
</ul>"#;

        let error = adapter.parse_listing(html).unwrap_err();
        assert_eq!(
            error,
            ParsingError::invalid_price("Preis auf Anfrage").at_item(1)
        );
    }

    #[test]
    fn test_unparseable_pagination_fails_the_page() {
        let mut adapter = offline_adapter();
        let html = r#"<div class="list_page"><div><div>?</div><a>2</a></div></div>"#;
        assert!(matches!(
            adapter.parse_listing(html),
            Err(ParsingError::InvalidPagination { ref raw }) if raw == "?"
        ));
    }

    #[rstest]
    #[case("1.999,00 €", 1999.0)]
    #[case("459,-", 459.0)]
    #[case("ab 12.345,50 EUR", 12345.5)]
    #[case("899 €", 899.0)]
    #[case("  79,90€ ", 79.9)]
    fn test_parse_price(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(offline_adapter().parse_price(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("Sterling by Music Man StingRay 5", "Sterling by Music Man", "StingRay 5")]
    #[case("Sterling SUB Ray4", "Sterling", "SUB Ray4")]
    #[case("Fenderish Custom", "Fenderish", "Custom")]
    #[case("Harley Benton ST-20LH", "Harley", "Benton ST-20LH")]
    #[case("Fender", "Fender", "")]
    fn test_split_product_name(
        #[case] name: &str,
        #[case] manufacturer: &str,
        #[case] model: &str,
    ) {
        let mut adapter = offline_adapter();
        adapter.parse_listing(PAGE_ONE).unwrap();
        assert_eq!(
            adapter.split_product_name(name),
            (manufacturer.to_string(), model.to_string())
        );
    }

    #[rstest]
    #[case("e-gitarre-linkshaender", 1, "https://www.musik-produktiv.de/e-gitarre-linkshaender")]
    #[case("e-gitarre-linkshaender", 3, "https://www.musik-produktiv.de/e-gitarre-linkshaender?p=3")]
    #[case("/suche?q=lh", 2, "https://www.musik-produktiv.de/suche?q=lh&p=2")]
    fn test_listing_url(#[case] category: &str, #[case] page: u32, #[case] expected: &str) {
        assert_eq!(offline_adapter().listing_url(category, page), expected);
    }

    #[tokio::test]
    async fn test_fetch_page_uses_injected_fetch() {
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with_page("https://www.musik-produktiv.de/e-gitarre-linkshaender?p=3", PAGE_THREE),
        );
        let mut adapter = adapter(fetch.clone(), &["e-gitarre-linkshaender"]);

        let page = adapter.fetch_page("e-gitarre-linkshaender", 3).await.unwrap();

        assert_eq!((page.current_page, page.last_page), (3, 3));
        assert_eq!(page.products[0].manufacturer, "Gretsch");
        assert_eq!(fetch.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let mut adapter = offline_adapter();
        let error = adapter.fetch_page("e-bass-linkshaender", 1).await.unwrap_err();
        assert!(matches!(
            error,
            RetailerError::Fetch(FetchError::Status { status: 404, .. })
        ));
    }
}
