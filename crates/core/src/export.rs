//! Static export of the storefront.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use ignite_shop_types::is_valid_product_id;
use tracing::{info, warn};

use crate::{
    catalog::CatalogClient,
    pages::{DetailPage, GenerateError, generate_detail, generate_listing},
    storefront::Storefront,
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write {}: {}", .0.display(), .1)]
    Write(PathBuf, std::io::Error),
    #[error("Failed to generate pages: {0}")]
    Generate(#[from] Arc<GenerateError>),
    #[error("Product id '{0}' cannot be used as a file name")]
    InvalidProductId(String),
}

impl From<GenerateError> for ExportError {
    fn from(error: GenerateError) -> Self {
        ExportError::Generate(Arc::new(error))
    }
}

/// Files written by [`export_site`], relative to the output directory
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub pages: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
}

/// File a detail page is exported to, so `/product/<id>` resolves on a
/// static file server
pub fn detail_file(product_id: &str) -> PathBuf {
    Path::new("product").join(product_id).join("index.html")
}

/// Generate the listing, a detail page for every listed product and for each
/// configured id that is not listed, then write them with the static assets
/// under `out_dir`:
///
/// ```text
/// out_dir/index.html
/// out_dir/product/<id>/index.html
/// out_dir/static/<asset>
/// ```
///
/// Every product id is checked before anything is written.
pub async fn export_site<C: CatalogClient>(
    storefront: &Storefront<C>,
    out_dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let site_name = storefront.site_name();
    let listing = generate_listing(storefront.catalog(), storefront.mapper()).await?;

    let unlisted: Vec<&str> = storefront
        .config()
        .detail
        .prerender
        .iter()
        .map(String::as_str)
        .filter(|id| !listing.products.iter().any(|product| product.id == *id))
        .collect();
    let invalid = listing
        .products
        .iter()
        .map(|product| product.id.as_str())
        .chain(unlisted.iter().copied())
        .find(|id| !is_valid_product_id(id));
    if let Some(id) = invalid {
        return Err(ExportError::InvalidProductId(id.to_string()));
    }

    let mut pages = vec![(PathBuf::from("index.html"), listing.render(site_name))];
    for product in &listing.products {
        let page = DetailPage {
            product: product.clone(),
        };
        pages.push((detail_file(&product.id), page.render(site_name)));
    }
    for product_id in unlisted {
        match generate_detail(storefront.catalog(), storefront.mapper(), product_id).await {
            Ok(page) => pages.push((detail_file(product_id), page.render(site_name))),
            Err(GenerateError::NotFound(_)) => {
                warn!(product = %product_id, "Skipping unknown product");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut summary = ExportSummary::default();
    for (relative, html) in pages {
        write_file(&out_dir.join(&relative), html.as_bytes())?;
        summary.pages.push(relative);
    }

    for (path, contents) in ignite_shop_assets::files() {
        let relative = Path::new("static").join(path);
        write_file(&out_dir.join(&relative), contents)?;
        summary.assets.push(relative);
    }

    info!(
        pages = summary.pages.len(),
        assets = summary.assets.len(),
        "Exported storefront to {}",
        out_dir.display()
    );
    Ok(summary)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExportError::Write(parent.to_path_buf(), e))?;
    }
    fs::write(path, contents).map_err(|e| ExportError::Write(path.to_path_buf(), e))
}
