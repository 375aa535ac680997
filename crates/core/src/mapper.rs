//! Shapes raw catalog records into the flat records the pages render.

use ignite_shop_types::{CatalogProduct, ProductViewModel};
use tracing::debug;

use crate::pricing::{CurrencyFormat, format_price};

/// Inline SVG shown for products without images
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20width%3D%22520%22%20height%3D%22480%22%3E%3Crect%20width%3D%22100%25%22%20height%3D%22100%25%22%20fill%3D%22%23202024%22%2F%3E%3C%2Fsvg%3E";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Product {0} has no default price")]
    MissingPrice(String),
    #[error("Default price of product {0} was not expanded")]
    PriceNotExpanded(String),
    #[error("Default price {price_id} of product {product_id} has no unit amount")]
    MissingUnitAmount {
        product_id: String,
        price_id: String,
    },
}

/// Settings the mapper applies to every product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    pub currency: CurrencyFormat,
    pub placeholder_image: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyFormat::default(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

/// Map a catalog product to its view model.
///
/// The price string depends only on `unit_amount` and the configured
/// format; the currency reported by the provider is not consulted.
pub fn to_view_model(
    product: &CatalogProduct,
    config: &MapperConfig,
) -> Result<ProductViewModel, MapError> {
    let default_price = product
        .default_price
        .as_ref()
        .ok_or_else(|| MapError::MissingPrice(product.id.clone()))?;
    let price = default_price
        .as_object()
        .ok_or_else(|| MapError::PriceNotExpanded(product.id.clone()))?;
    let unit_amount = price.unit_amount.ok_or_else(|| MapError::MissingUnitAmount {
        product_id: product.id.clone(),
        price_id: price.id.clone(),
    })?;

    if !price.currency.eq_ignore_ascii_case(config.currency.currency()) {
        debug!(
            product = %product.id,
            price_currency = %price.currency,
            display_currency = %config.currency.currency(),
            "Price currency differs from display currency"
        );
    }

    let image_url = product
        .images
        .first()
        .cloned()
        .unwrap_or_else(|| config.placeholder_image.clone());

    Ok(ProductViewModel {
        id: product.id.clone(),
        name: product.name.clone(),
        image_url,
        price: format_price(unit_amount, &config.currency),
        description: product.description.clone(),
        default_price_id: price.id.clone(),
    })
}

/// Map every product, preserving order. The first failure aborts.
pub fn to_view_models(
    products: &[CatalogProduct],
    config: &MapperConfig,
) -> Result<Vec<ProductViewModel>, MapError> {
    products
        .iter()
        .map(|product| to_view_model(product, config))
        .collect()
}
