//! Shared types for the Ignite Shop storefront.
//!
//! - [`stripe`]: read-only records returned by the payments/catalog provider
//! - [`view`]: flat display records the pages render
//! - [`checkout`]: JSON bodies exchanged with the checkout endpoint

pub mod checkout;
pub mod stripe;
pub mod view;

pub use checkout::{CheckoutRequest, CheckoutResponse};
pub use stripe::{CatalogProduct, CheckoutSession, Expandable, ListResponse, Price};
pub use view::ProductViewModel;

/// Default name of the storefront manifest file
pub const MANIFEST_FILE_NAME: &str = "storefront.yaml";

/// Route of the checkout-session endpoint the detail page posts to
pub const CHECKOUT_ROUTE: &str = "/api/checkout";

/// Longest product identifier accepted in a route
pub const MAX_PRODUCT_ID_LEN: usize = 255;

/// Path of the detail page for a product identifier
pub fn product_path(product_id: &str) -> String {
    format!("/product/{}", product_id)
}

/// Whether `product_id` can name a product: non-empty ASCII letters, digits,
/// `_` and `-` only, so it is also safe as a path segment on disk.
pub fn is_valid_product_id(product_id: &str) -> bool {
    !product_id.is_empty()
        && product_id.len() <= MAX_PRODUCT_ID_LEN
        && product_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
