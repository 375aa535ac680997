use std::net::{IpAddr, SocketAddr};

use console::style;
use ignite_shop_core::{config::DEFAULT_PORT, start_server};
use tokio::net::TcpListener;

use crate::Context;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct ServeCommand {
    /// Port to run the server on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

impl ServeCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let host: IpAddr = self
            .host
            .parse()
            .map_err(|e| format!("Invalid host {}: {}", self.host, e))?;
        let addr = SocketAddr::new(host, self.port);

        println!();
        println!("{}", style(&ctx.config.site_name).green().bold());
        println!("{}", style("Starting storefront").dim());
        println!();

        // Bind first so a taken port fails before any page is generated
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| e.to_string())?;

        let storefront = ctx.storefront()?;

        print!("{} ", style("Pre-rendering pages").dim());
        let count = storefront
            .prerender_all()
            .await
            .map_err(|e| format!("Failed to pre-render pages: {}", e))?;
        println!("{} {}", style("✓").green(), style(format!("{} pages", count)).dim());

        println!(
            "{} {}",
            style("Listening on").dim(),
            style(format!("http://{}", local_addr)).cyan()
        );
        println!();

        start_server(storefront, listener)
            .await
            .map_err(|e| format!("Server error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ignite_shop_core::StorefrontConfig;

    use super::*;

    #[tokio::test]
    async fn test_taken_port_fails_before_serving() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let ctx = Context {
            manifest_path: PathBuf::from("./storefront.yaml"),
            config: StorefrontConfig::default(),
            stripe_secret_key: None,
        };

        let cmd = ServeCommand {
            port,
            host: "127.0.0.1".to_string(),
        };
        let error = cmd.execute(&ctx).await.unwrap_err();
        assert!(error.starts_with("Failed to bind"), "{error}");
    }
}
