//! Stripe client used by the storefront, built on `async-stripe`.
//!
//! Covers the three calls the shop makes: listing products, retrieving one
//! product (both with the default price expanded) and creating a hosted
//! checkout session. Stripe objects are converted into the records of
//! `ignite-shop-types`.

use std::{collections::HashMap, fmt};

use chrono::DateTime;
use ignite_shop_types::{
    CatalogProduct, CheckoutSession, Expandable, ListResponse, Price, is_valid_product_id,
};
use indexmap::IndexMap;
use stripe::{
    CheckoutSessionMode, Client, CreateCheckoutSessionLineItems, ListProducts,
    Price as StripePrice, Product as StripeProduct, ProductId,
};
use tracing::debug;
use url::Url;

mod error;

pub use error::{Result, StripeError};

/// Production Stripe API
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Largest page size Stripe accepts on list endpoints
const PAGE_LIMIT: u64 = 100;

/// Parameters for a single-item hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSession {
    pub price_id: String,
    pub quantity: u32,
    pub success_url: String,
    pub cancel_url: String,
}

impl CreateCheckoutSession {
    pub fn new(
        price_id: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            price_id: price_id.into(),
            quantity: 1,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }
}

/// Stripe API client holding one connection pool and one secret key
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("test_mode", &self.is_test_mode())
            .finish_non_exhaustive()
    }
}

/// Convert Stripe metadata (HashMap) to IndexMap with sorted keys for consistent ordering
fn metadata_to_sorted_indexmap(metadata: HashMap<String, String>) -> IndexMap<String, String> {
    let mut entries: Vec<_> = metadata.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
}

fn convert_price(price: StripePrice) -> Price {
    Price {
        id: price.id.to_string(),
        currency: price.currency.unwrap_or_default().to_string(),
        unit_amount: price.unit_amount,
        active: price.active.unwrap_or(true),
    }
}

fn convert_product(product: StripeProduct) -> CatalogProduct {
    let default_price = product.default_price.map(|price| match price {
        stripe::Expandable::Id(id) => Expandable::Id(id.to_string()),
        stripe::Expandable::Object(price) => Expandable::Object(Box::new(convert_price(*price))),
    });

    CatalogProduct {
        id: product.id.to_string(),
        name: product.name.unwrap_or_default(),
        images: product.images.unwrap_or_default(),
        description: product.description,
        default_price,
        active: product.active.unwrap_or(true),
        metadata: metadata_to_sorted_indexmap(product.metadata.unwrap_or_default()),
        created: product.created.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    }
}

fn parse_product_id(product_id: &str) -> Result<ProductId> {
    if !is_valid_product_id(product_id) {
        return Err(StripeError::InvalidProductId(product_id.to_string()));
    }
    product_id
        .parse()
        .map_err(|_| StripeError::InvalidProductId(product_id.to_string()))
}

impl StripeClient {
    /// Client against the production Stripe API
    pub fn new(secret_key: impl Into<String>) -> Self {
        let secret_key = secret_key.into();
        Self {
            client: Client::new(secret_key.clone()),
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key,
        }
    }

    /// Point the client at another Stripe-compatible server
    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        let url =
            Url::parse(api_base).map_err(|e| StripeError::InvalidBaseUrl(format!("{api_base}: {e}")))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(StripeError::InvalidBaseUrl(api_base.to_string()));
        }
        self.client = Client::from_url(url.as_str(), self.secret_key.clone());
        self.api_base = url.into();
        Ok(self)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Whether the key is a test-mode key
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_") || self.secret_key.starts_with("rk_test_")
    }

    /// Fetch every product, following `has_more` pagination, with each
    /// product's default price expanded. Order is the provider's.
    pub async fn list_products(&self) -> Result<Vec<CatalogProduct>> {
        let mut products = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let page = self.list_products_page(starting_after.as_deref()).await?;
            let has_more = page.has_more;

            if let Some(last_product) = page.data.last() {
                starting_after = Some(last_product.id.clone());
            }

            products.extend(page.data);

            if !has_more || starting_after.is_none() {
                break;
            }
        }

        debug!(count = products.len(), "Listed Stripe products");
        Ok(products)
    }

    /// Fetch one page of products (GET /v1/products)
    pub async fn list_products_page(
        &self,
        starting_after: Option<&str>,
    ) -> Result<ListResponse<CatalogProduct>> {
        let mut params = ListProducts::new();
        params.expand = &["data.default_price"];
        params.limit = Some(PAGE_LIMIT);
        if let Some(last_id) = starting_after {
            params.starting_after = Some(parse_product_id(last_id)?);
        }

        let page = StripeProduct::list(&self.client, &params).await?;
        Ok(ListResponse::new(
            page.data.into_iter().map(convert_product).collect(),
            page.has_more,
            page.url,
        ))
    }

    /// Fetch one product with its default price expanded (GET /v1/products/{id})
    pub async fn retrieve_product(&self, product_id: &str) -> Result<CatalogProduct> {
        let id = parse_product_id(product_id)?;
        let product = StripeProduct::retrieve(&self.client, &id, &["default_price"]).await?;
        Ok(convert_product(product))
    }

    /// Create a hosted checkout session (POST /v1/checkout/sessions)
    pub async fn create_checkout_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<CheckoutSession> {
        let mut params = stripe::CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(u64::from(request.quantity)),
            ..Default::default()
        }]);

        let session = stripe::CheckoutSession::create(&self.client, params).await?;
        debug!(session = %session.id, "Created checkout session");
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }
}
