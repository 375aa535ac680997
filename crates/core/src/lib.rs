//! Ignite Shop storefront: page generation, the page cache and the HTTP server.

pub mod cache;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod export;
pub mod mapper;
pub mod pages;
pub mod pricing;
pub mod render;
pub mod server;
pub mod storefront;

pub use cache::{Artifact, ArtifactKind, CacheStatus, FallbackMode, PageCache, Served};
pub use catalog::{CatalogClient, CatalogError, CheckoutSessions};
pub use checkout::{
    CheckoutError, CheckoutInitiator, CheckoutOutcome, CheckoutTransport, HttpCheckoutTransport,
    Navigator, checkout_target,
};
pub use config::{ConfigError, StorefrontConfig};
pub use export::{ExportError, ExportSummary, detail_file, export_site};
pub use mapper::{MapError, MapperConfig, to_view_model, to_view_models};
pub use pricing::{CurrencyFormat, Locale, PricingError, format_price};
pub use server::{create_router, start_server};
pub use storefront::Storefront;
