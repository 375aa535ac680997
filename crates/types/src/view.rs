use serde::{Deserialize, Serialize};

/// Flat display record derived from a catalog product on every regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductViewModel {
    pub id: String,
    pub name: String,
    /// First image of the product, or the configured placeholder
    pub image_url: String,
    /// Price formatted for the configured locale and currency
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price identifier posted to the checkout endpoint
    pub default_price_id: String,
}
