use console::style;
use ignite_shop_core::{CheckoutInitiator, CheckoutOutcome, HttpCheckoutTransport, Navigator};
use url::Url;

use crate::Context;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct CheckoutCommand {
    /// Price to buy (the product's default price id)
    pub price_id: String,

    /// Base URL of a running storefront
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub url: Url,

    /// Print the checkout URL instead of opening it in a browser
    #[arg(long)]
    pub no_open: bool,
}

/// Follows checkout redirects in the user's browser
struct TerminalNavigator {
    open_browser: bool,
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, url: &Url) {
        println!("{} {}", style("✓").green(), style(url).cyan());
        if self.open_browser && open::that(url.as_str()).is_err() {
            println!(
                "Failed to automatically open your browser. Please open the following URL: {}",
                url
            );
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }
}

impl CheckoutCommand {
    pub async fn execute(&self, _ctx: &Context) -> Result<(), String> {
        let transport =
            HttpCheckoutTransport::for_storefront(&self.url).map_err(|e| e.to_string())?;
        println!(
            "{} {}",
            style("Creating checkout session at").dim(),
            style(transport.endpoint()).cyan()
        );

        let initiator = CheckoutInitiator::new(
            transport,
            TerminalNavigator {
                open_browser: !self.no_open,
            },
        );
        match initiator.initiate_checkout(&self.price_id).await {
            CheckoutOutcome::Redirected(_) | CheckoutOutcome::Ignored => Ok(()),
            CheckoutOutcome::Failed(e) => Err(e.to_string()),
        }
    }
}
