use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator placed between the natural key components.
///
/// ASCII unit separator: never produced by listing markup, so keys only
/// collide when a field itself contains it.
pub const KEY_DELIMITER: char = '\u{1f}';

/// Normalized product record produced by every retailer adapter.
///
/// `created_at` / `updated_at` stay at the Unix epoch until the product is
/// stamped by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub retailer: String,
    pub manufacturer: String,
    pub model: String,
    pub category: String,
    pub is_available: bool,
    pub availability_info: String,
    /// Currency is implied by the retailer.
    pub price: f64,
    pub product_url: String,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a product identified by its natural key; everything else defaults.
    pub fn new(
        retailer: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            retailer: retailer.into(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the price and return the product
    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Set the category and return the product
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Derived key: retailer, manufacturer and model joined by [`KEY_DELIMITER`].
    ///
    /// Empty manufacturer or model still produce a well-defined key.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(
            self.retailer.len() + self.manufacturer.len() + self.model.len() + 2,
        );
        key.push_str(&self.retailer);
        key.push(KEY_DELIMITER);
        key.push_str(&self.manufacturer);
        key.push(KEY_DELIMITER);
        key.push_str(&self.model);
        key
    }

    /// Whether both products describe the same logical item
    pub fn same_entity(&self, other: &Self) -> bool {
        self.retailer == other.retailer
            && self.manufacturer == other.manufacturer
            && self.model == other.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_ignores_non_identifying_fields() {
        let a = Product::new("Musik Produktiv", "Fender", "AM Pro II Jazzmaster LH MN MYS")
            .with_price(1999.0)
            .with_category("E-Gitarren");
        let mut b = a.clone().with_price(1799.0);
        b.is_available = true;
        b.thumbnail_url = "https://example.com/thumb.jpg".to_string();

        assert_eq!(a.key(), b.key());
        assert!(a.same_entity(&b));
    }

    #[test]
    fn test_degenerate_key_is_still_defined() {
        let empty = Product::new("Test", "", "");
        assert_eq!(empty.key(), "Test\u{1f}\u{1f}");
        assert_ne!(empty.key(), Product::new("Test", "", "x").key());
    }

    #[test]
    fn test_serialized_field_names() {
        let product = Product::new("Test", "Gretsch", "G2622LH").with_price(459.0);
        let value = serde_json::to_value(&product).unwrap();

        assert_eq!(value["manufacturer"], "Gretsch");
        assert_eq!(value["isAvailable"], false);
        assert_eq!(value["productUrl"], "");
        assert!(value["createdAt"].is_string());
    }

    proptest! {
        #[test]
        fn key_matches_identity(
            retailer in "[^\u{1f}]{0,12}",
            manufacturer in "[^\u{1f}]{0,12}",
            model in "[^\u{1f}]{0,12}",
            other_model in "[^\u{1f}]{0,12}",
        ) {
            let a = Product::new(&retailer, &manufacturer, &model);
            let b = Product::new(&retailer, &manufacturer, &other_model).with_price(10.0);
            prop_assert_eq!(a.key() == b.key(), model == other_model);
            prop_assert_eq!(a.key() == b.key(), a.same_entity(&b));
        }

        #[test]
        fn key_tracks_retailer(
            retailer in "[^\u{1f}]{0,12}",
            other_retailer in "[^\u{1f}]{0,12}",
            manufacturer in "[^\u{1f}]{0,12}",
            model in "[^\u{1f}]{0,12}",
        ) {
            let a = Product::new(&retailer, &manufacturer, &model);
            let b = Product::new(&other_retailer, &manufacturer, &model);
            prop_assert_eq!(a.key() == b.key(), retailer == other_retailer);
        }

        #[test]
        fn key_tracks_manufacturer(
            retailer in "[^\u{1f}]{0,12}",
            manufacturer in "[^\u{1f}]{0,12}",
            other_manufacturer in "[^\u{1f}]{0,12}",
            model in "[^\u{1f}]{0,12}",
        ) {
            let a = Product::new(&retailer, &manufacturer, &model);
            let b = Product::new(&retailer, &other_manufacturer, &model).with_category("basses");
            prop_assert_eq!(a.key() == b.key(), manufacturer == other_manufacturer);
            prop_assert_eq!(a.key() == b.key(), a.same_entity(&b));
        }
    }
}
