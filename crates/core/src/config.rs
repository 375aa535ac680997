use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ignite_shop_driver_stripe::DEFAULT_API_BASE;
use ignite_shop_types::{MANIFEST_FILE_NAME, is_valid_product_id};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    cache::FallbackMode,
    mapper::{DEFAULT_PLACEHOLDER_IMAGE, MapperConfig},
    pricing::{CurrencyFormat, PricingError},
};

pub const DEFAULT_PORT: u16 = 3000;
/// Product pre-rendered when no list is configured
pub const DEFAULT_PRERENDER_ID: &str = "prod_NYxIK1Z2y9QZ8H";

/// Storefront manifest (`storefront.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub site_name: String,
    pub stripe: StripeSection,
    pub pricing: PricingSection,
    pub listing: ListingSection,
    pub detail: DetailSection,
    pub checkout: CheckoutSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeSection {
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// BCP 47 tag, e.g. `pt-BR`
    pub locale: String,
    /// ISO 4217 code, e.g. `BRL`
    pub currency: String,
    /// Image used for products without images
    pub placeholder_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSection {
    pub revalidate_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSection {
    pub revalidate_secs: u64,
    /// Product identifiers generated at startup
    pub prerender: Vec<String>,
    pub fallback: FallbackMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSection {
    pub success_url: String,
    pub cancel_url: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            site_name: "Ignite Shop".to_string(),
            stripe: StripeSection::default(),
            pricing: PricingSection::default(),
            listing: ListingSection::default(),
            detail: DetailSection::default(),
            checkout: CheckoutSection::default(),
        }
    }
}

impl Default for StripeSection {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for PricingSection {
    fn default() -> Self {
        Self {
            locale: "pt-BR".to_string(),
            currency: "BRL".to_string(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

impl Default for ListingSection {
    fn default() -> Self {
        Self {
            revalidate_secs: 60 * 60 * 2,
        }
    }
}

impl Default for DetailSection {
    fn default() -> Self {
        Self {
            revalidate_secs: 60 * 60,
            prerender: vec![DEFAULT_PRERENDER_ID.to_string()],
            fallback: FallbackMode::Shell,
        }
    }
}

impl Default for CheckoutSection {
    fn default() -> Self {
        Self {
            success_url: format!("http://localhost:{DEFAULT_PORT}/?checkout=success"),
            cancel_url: format!("http://localhost:{DEFAULT_PORT}/"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} not found at {}. Please create a {} file in your project root.",
        MANIFEST_FILE_NAME,
        .0.display(),
        MANIFEST_FILE_NAME)]
    FileNotFound(PathBuf),
    #[error("Failed to read {}: {}", .0.display(), .1)]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    ParseError(PathBuf, serde_yml::Error),
    #[error("Invalid pricing configuration: {0}")]
    Pricing(#[from] PricingError),
    #[error("Revalidation interval for {0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("Invalid product id '{0}' in detail.prerender")]
    InvalidProductId(String),
}

impl StorefrontConfig {
    /// Load the manifest from the specified file path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;

        let config: StorefrontConfig = serde_yml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the manifest, using defaults when the file doesn't exist. Other
    /// failures are still returned.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(path)) => {
                warn!(
                    "{} not found at {}, using defaults",
                    MANIFEST_FILE_NAME,
                    path.display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.currency_format()?;
        if self.listing.revalidate_secs == 0 {
            return Err(ConfigError::ZeroInterval("listing"));
        }
        if self.detail.revalidate_secs == 0 {
            return Err(ConfigError::ZeroInterval("detail"));
        }
        if let Some(id) = self.detail.prerender.iter().find(|id| !is_valid_product_id(id)) {
            return Err(ConfigError::InvalidProductId(id.clone()));
        }
        Ok(())
    }

    pub fn currency_format(&self) -> Result<CurrencyFormat, PricingError> {
        CurrencyFormat::new(&self.pricing.locale, &self.pricing.currency)
    }

    pub fn mapper_config(&self) -> Result<MapperConfig, ConfigError> {
        Ok(MapperConfig {
            currency: self.currency_format()?,
            placeholder_image: self.pricing.placeholder_image.clone(),
        })
    }

    pub fn listing_interval(&self) -> Duration {
        Duration::from_secs(self.listing.revalidate_secs)
    }

    pub fn detail_interval(&self) -> Duration {
        Duration::from_secs(self.detail.revalidate_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::pricing::Locale;

    fn manifest(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.listing_interval(), Duration::from_secs(7200));
        assert_eq!(config.detail_interval(), Duration::from_secs(3600));
        assert_eq!(config.detail.prerender, vec!["prod_NYxIK1Z2y9QZ8H"]);
        assert_eq!(config.detail.fallback, FallbackMode::Shell);
        assert_eq!(config.mapper_config().unwrap().currency.locale(), Locale::PtBr);
    }

    #[test]
    fn test_partial_manifest_keeps_defaults() {
        let file = manifest(
            r#"
site_name: Loja
pricing:
  locale: en-US
  currency: USD
detail:
  prerender: [prod_a, prod_b]
  fallback: blocking
"#,
        );
        let config = StorefrontConfig::load(file.path()).unwrap();

        assert_eq!(config.site_name, "Loja");
        assert_eq!(config.pricing.currency, "USD");
        assert_eq!(config.pricing.placeholder_image, DEFAULT_PLACEHOLDER_IMAGE);
        assert_eq!(config.detail.prerender, vec!["prod_a", "prod_b"]);
        assert_eq!(config.detail.fallback, FallbackMode::Blocking);
        assert_eq!(config.detail.revalidate_secs, 3600);
        assert_eq!(config.stripe.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_unknown_locale_is_rejected() {
        let file = manifest("pricing:\n  locale: xx-YY\n");
        let error = StorefrontConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Pricing(_)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let file = manifest("listing:\n  revalidate_secs: 0\n");
        let error = StorefrontConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::ZeroInterval("listing")));
    }

    #[test]
    fn test_prerender_ids_are_validated() {
        let file = manifest("detail:\n  prerender: [prod_a, ../../etc/passwd]\n");
        let error = StorefrontConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidProductId(id) if id == "../../etc/passwd"));
    }

    #[test]
    fn test_malformed_yaml() {
        let file = manifest("detail: [unclosed\n");
        let error = StorefrontConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);

        assert!(matches!(
            StorefrontConfig::load(&path),
            Err(ConfigError::FileNotFound(_))
        ));
        assert_eq!(
            StorefrontConfig::load_or_default(&path).unwrap(),
            StorefrontConfig::default()
        );
    }
}
