use ignite_shop_types::{ProductViewModel, product_path};
use tracing::info;

use super::GenerateError;
use crate::{
    catalog::CatalogClient,
    mapper::{MapperConfig, to_view_models},
    render::{Document, escape},
};

/// Slides visible at once
pub const SLIDES_PER_VIEW: u32 = 3;
/// Gap between slides, in pixels
pub const SLIDE_SPACING: u32 = 48;
pub const SLIDE_WIDTH: u32 = 520;
pub const SLIDE_HEIGHT: u32 = 480;

/// The product grid shown at `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub products: Vec<ProductViewModel>,
}

/// Fetch the whole catalog and map it, keeping the provider's order
pub async fn generate_listing<C: CatalogClient>(
    catalog: &C,
    mapper: &MapperConfig,
) -> Result<ListingPage, GenerateError> {
    let products = catalog.list_products().await?;
    let products = to_view_models(&products, mapper)?;
    info!(count = products.len(), "Generated listing page");
    Ok(ListingPage { products })
}

impl ListingPage {
    pub fn render(&self, site_name: &str) -> String {
        let mut body = String::new();
        body.push_str(&format!(
            "<main class=\"home-container keen-slider\" data-slider data-mode=\"free-snap\" data-per-view=\"{}\" data-spacing=\"{}\">\n",
            SLIDES_PER_VIEW, SLIDE_SPACING
        ));
        for product in &self.products {
            body.push_str(&format!(
                "<a class=\"product keen-slider__slide\" href=\"{href}\">\
                 <img src=\"{src}\" width=\"{w}\" height=\"{h}\" alt=\"\">\
                 <footer><strong>{name}</strong><span>{price}</span></footer></a>\n",
                href = escape(&product_path(&product.id)),
                src = escape(&product.image_url),
                w = SLIDE_WIDTH,
                h = SLIDE_HEIGHT,
                name = escape(&product.name),
                price = escape(&product.price),
            ));
        }
        body.push_str("</main>\n");

        Document {
            title: "Home",
            site_name,
            body: &body,
            scripts: &["/static/slider.js"],
            refresh_after: None,
        }
        .render()
    }
}
