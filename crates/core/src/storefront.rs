use std::{sync::Arc, time::Duration};

use chrono::Utc;
use ignite_shop_types::{is_valid_product_id, product_path};
use tracing::{debug, error, info};

use crate::{
    cache::{Artifact, CacheStatus, FallbackMode, PageCache, Served},
    catalog::CatalogClient,
    config::{ConfigError, StorefrontConfig},
    mapper::MapperConfig,
    pages::{GenerateError, generate_detail, generate_listing},
    render::not_found_page,
};

/// Cache key of the listing page
pub const LISTING_KEY: &str = "/";

/// Catalog, configuration and rendered pages of one storefront
pub struct Storefront<C> {
    catalog: Arc<C>,
    config: Arc<StorefrontConfig>,
    mapper: Arc<MapperConfig>,
    cache: PageCache,
}

impl<C> Clone for Storefront<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            config: self.config.clone(),
            mapper: self.mapper.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<C: CatalogClient> Storefront<C> {
    pub fn new(catalog: C, config: StorefrontConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mapper = config.mapper_config()?;
        Ok(Self {
            catalog: Arc::new(catalog),
            config: Arc::new(config),
            mapper: Arc::new(mapper),
            cache: PageCache::new(),
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn mapper(&self) -> &MapperConfig {
        &self.mapper
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn site_name(&self) -> &str {
        &self.config.site_name
    }

    pub fn listing_interval(&self) -> Duration {
        self.config.listing_interval()
    }

    pub fn detail_interval(&self) -> Duration {
        self.config.detail_interval()
    }

    pub async fn listing(&self) -> Result<Served, Arc<GenerateError>> {
        // The listing is always generated before serving
        self.cache
            .serve(
                LISTING_KEY,
                self.listing_interval(),
                FallbackMode::Blocking,
                self.listing_generator(),
            )
            .await
    }

    /// Detail page for `product_id`. Malformed ids get a not-found page
    /// without asking the catalog or touching the cache.
    pub async fn detail(&self, product_id: &str) -> Result<Served, Arc<GenerateError>> {
        if !is_valid_product_id(product_id) {
            debug!(product = %product_id, "Rejected malformed product id");
            return Ok(Served::Page {
                artifact: Artifact::not_found(not_found_page(&self.config.site_name)),
                status: CacheStatus::Miss,
                generated_at: Utc::now(),
                revalidate: self.detail_interval(),
            });
        }

        self.cache
            .serve(
                &product_path(product_id),
                self.detail_interval(),
                self.config.detail.fallback,
                self.detail_generator(product_id),
            )
            .await
    }

    /// Generate the listing and every configured detail page. Returns the
    /// number of pages stored.
    pub async fn prerender_all(&self) -> Result<usize, Arc<GenerateError>> {
        self.cache
            .prerender(LISTING_KEY, self.listing_interval(), self.listing_generator())
            .await?;
        let mut count = 1;

        for product_id in &self.config.detail.prerender {
            let artifact = self
                .cache
                .prerender(
                    &product_path(product_id),
                    self.detail_interval(),
                    self.detail_generator(product_id),
                )
                .await
                .inspect_err(|e| error!(product = %product_id, "Failed to pre-render: {}", e))?;
            count += 1;
            info!(product = %product_id, kind = ?artifact.kind, "Pre-rendered detail page");
        }

        Ok(count)
    }

    fn listing_generator(
        &self,
    ) -> impl FnOnce() -> std::pin::Pin<
        Box<dyn Future<Output = Result<Artifact, GenerateError>> + Send + 'static>,
    > + use<C> {
        let catalog = self.catalog.clone();
        let mapper = self.mapper.clone();
        let config = self.config.clone();
        move || {
            Box::pin(async move {
                let page = generate_listing(catalog.as_ref(), &mapper).await?;
                Ok(Artifact::ready(page.render(&config.site_name)))
            })
        }
    }

    fn detail_generator(
        &self,
        product_id: &str,
    ) -> impl FnOnce() -> std::pin::Pin<
        Box<dyn Future<Output = Result<Artifact, GenerateError>> + Send + 'static>,
    > + use<C> {
        let catalog = self.catalog.clone();
        let mapper = self.mapper.clone();
        let config = self.config.clone();
        let product_id = product_id.to_string();
        move || {
            Box::pin(async move {
                match generate_detail(catalog.as_ref(), &mapper, &product_id).await {
                    Ok(page) => Ok(Artifact::ready(page.render(&config.site_name))),
                    Err(GenerateError::NotFound(_)) => {
                        Ok(Artifact::not_found(not_found_page(&config.site_name)))
                    }
                    Err(e) => Err(e),
                }
            })
        }
    }
}
