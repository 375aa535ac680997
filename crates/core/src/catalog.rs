//! Seams between the storefront and the payments provider.
//!
//! Page generation only needs [`CatalogClient`]; the checkout endpoint needs
//! [`CheckoutSessions`]. [`StripeClient`] implements both, tests use fakes.

use std::future::Future;

use ignite_shop_driver_stripe::{CreateCheckoutSession, StripeClient, StripeError};
use ignite_shop_types::CatalogProduct;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The provider has no product with this identifier
    #[error("Product {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] StripeError),

    /// Any other failure, as reported by the client
    #[error("{0}")]
    Other(String),
}

/// Read access to the product catalog, always with the default price expanded
pub trait CatalogClient: Send + Sync + 'static {
    fn list_products(&self) -> impl Future<Output = Result<Vec<CatalogProduct>, CatalogError>> + Send;

    fn get_product(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<CatalogProduct, CatalogError>> + Send;
}

/// Creation of hosted checkout sessions
pub trait CheckoutSessions: Send + Sync + 'static {
    /// Create a session for one unit of `price_id` and return its hosted URL
    fn create_checkout_url(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> impl Future<Output = Result<String, CatalogError>> + Send;
}

impl CatalogClient for StripeClient {
    async fn list_products(&self) -> Result<Vec<CatalogProduct>, CatalogError> {
        Ok(StripeClient::list_products(self).await?)
    }

    async fn get_product(&self, product_id: &str) -> Result<CatalogProduct, CatalogError> {
        self.retrieve_product(product_id).await.map_err(|e| {
            if e.is_not_found() {
                CatalogError::NotFound(product_id.to_string())
            } else {
                CatalogError::Provider(e)
            }
        })
    }
}

impl CheckoutSessions for StripeClient {
    async fn create_checkout_url(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, CatalogError> {
        let params = CreateCheckoutSession::new(price_id, success_url, cancel_url);
        let session = self.create_checkout_session(&params).await?;
        session.url.ok_or_else(|| {
            CatalogError::Other(format!("Checkout session {} has no URL", session.id))
        })
    }
}
