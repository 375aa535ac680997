//! Stripe records as returned by the catalog API
//!
//! Only the fields the storefront reads are modelled. Everything else in the
//! provider's payload is ignored during deserialization.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A field Stripe returns either as a bare identifier or, when requested
/// through `expand[]`, as the full object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T> Expandable<T> {
    /// The expanded object, if the provider inlined it
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(object) => Some(object),
            Expandable::Id(_) => None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Expandable::Object(_))
    }
}

impl Expandable<Price> {
    /// Identifier of the referenced price, whether expanded or not
    pub fn id(&self) -> &str {
        match self {
            Expandable::Object(price) => &price.id,
            Expandable::Id(id) => id,
        }
    }
}

/// Stripe-compatible list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub object: String,
    pub data: Vec<T>,
    pub has_more: bool,
    pub url: String,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, has_more: bool, url: impl Into<String>) -> Self {
        Self {
            object: "list".to_string(),
            data,
            has_more,
            url: url.into(),
        }
    }
}

/// Stripe price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    /// Three-letter ISO currency code, lowercase on the wire (e.g. "brl")
    pub currency: String,
    /// Amount in the currency's minor unit. Null for custom/tiered pricing.
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Stripe product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_price: Option<Expandable<Price>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    /// Creation time, seconds since epoch on the wire
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created: Option<DateTime<Utc>>,
}

impl CatalogProduct {
    /// The expanded default price, if present
    pub fn price(&self) -> Option<&Price> {
        self.default_price.as_ref().and_then(Expandable::as_object)
    }
}

/// The subset of a Stripe checkout session the storefront reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page. Absent once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_expanded_default_price() {
        let product: CatalogProduct = serde_json::from_value(serde_json::json!({
            "id": "prod_NYxIK1Z2y9QZ8H",
            "object": "product",
            "name": "Camiseta Beyond the Limits",
            "images": ["https://files.stripe.com/a.png", "https://files.stripe.com/b.png"],
            "description": null,
            "created": 1680000000,
            "default_price": {
                "id": "price_1MnoHk",
                "object": "price",
                "currency": "brl",
                "unit_amount": 7990
            }
        }))
        .unwrap();

        assert!(product.default_price.as_ref().unwrap().is_expanded());
        let price = product.price().unwrap();
        assert_eq!(price.id, "price_1MnoHk");
        assert_eq!(price.unit_amount, Some(7990));
        assert_eq!(product.images.len(), 2);
        assert!(product.description.is_none());
        assert!(product.active);
        assert_eq!(product.created.unwrap().timestamp(), 1680000000);
    }

    #[test]
    fn test_deserialize_unexpanded_default_price() {
        let product: CatalogProduct = serde_json::from_value(serde_json::json!({
            "id": "prod_1",
            "name": "Explorer",
            "default_price": "price_123"
        }))
        .unwrap();

        let default_price = product.default_price.as_ref().unwrap();
        assert!(!default_price.is_expanded());
        assert_eq!(default_price.id(), "price_123");
        assert!(product.price().is_none());
        assert!(product.images.is_empty());
    }

    #[test]
    fn test_deserialize_list_response() {
        let list: ListResponse<CatalogProduct> = serde_json::from_value(serde_json::json!({
            "object": "list",
            "url": "/v1/products",
            "has_more": false,
            "data": [
                { "id": "prod_1", "name": "One" },
                { "id": "prod_2", "name": "Two" }
            ]
        }))
        .unwrap();

        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[1].id, "prod_2");
        assert!(!list.has_more);
    }
}
