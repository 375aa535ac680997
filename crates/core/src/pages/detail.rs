use ignite_shop_types::{CHECKOUT_ROUTE, ProductViewModel};
use tracing::info;

use super::GenerateError;
use crate::{
    catalog::CatalogClient,
    mapper::{MapperConfig, to_view_model},
    render::{Document, escape},
};

/// Label of the checkout button
pub const BUY_LABEL: &str = "Comprar agora";
/// Alert raised when the checkout session cannot be created
pub const CHECKOUT_FAILED_ALERT: &str = "Falha ao redirecionar ao checkout!";

/// A single product shown at `/product/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub product: ProductViewModel,
}

/// Fetch one product and map it. Unknown identifiers yield
/// [`GenerateError::NotFound`].
pub async fn generate_detail<C: CatalogClient>(
    catalog: &C,
    mapper: &MapperConfig,
    product_id: &str,
) -> Result<DetailPage, GenerateError> {
    let product = catalog.get_product(product_id).await?;
    let product = to_view_model(&product, mapper)?;
    info!(product = %product.id, "Generated detail page");
    Ok(DetailPage { product })
}

impl DetailPage {
    pub fn render(&self, site_name: &str) -> String {
        let product = &self.product;
        let mut body = String::new();
        body.push_str("<main class=\"product-container\">\n");
        body.push_str(&format!(
            "<div class=\"image-container\"><img src=\"{}\" alt=\"{}\"></div>\n",
            escape(&product.image_url),
            escape(&product.name)
        ));
        body.push_str("<div class=\"product-details\">\n");
        body.push_str(&format!("<h1>{}</h1>\n", escape(&product.name)));
        body.push_str(&format!("<span>{}</span>\n", escape(&product.price)));
        body.push_str(&format!(
            "<p>{}</p>\n",
            escape(product.description.as_deref().unwrap_or_default())
        ));
        body.push_str(&format!(
            "<button type=\"button\" data-checkout data-endpoint=\"{}\" data-price-id=\"{}\" data-error-message=\"{}\">{}</button>\n",
            CHECKOUT_ROUTE,
            escape(&product.default_price_id),
            escape(CHECKOUT_FAILED_ALERT),
            BUY_LABEL
        ));
        body.push_str("</div>\n</main>\n");

        Document {
            title: &product.name,
            site_name,
            body: &body,
            scripts: &["/static/checkout.js"],
            refresh_after: None,
        }
        .render()
    }
}
