use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use console::style;
use ignite_shop_core::{Storefront, StorefrontConfig};
use ignite_shop_driver_stripe::StripeClient;
use tracing_subscriber::EnvFilter;

mod build;
mod checkout;
mod serve;

pub const STRIPE_SECRET_KEY_ENV: &str = "STRIPE_SECRET_KEY";

#[derive(Clone, Debug)]
pub struct Context {
    pub manifest_path: PathBuf,
    pub config: StorefrontConfig,
    pub stripe_secret_key: Option<String>,
}

impl Context {
    /// Build the storefront over the configured Stripe account
    pub fn storefront(&self) -> Result<Storefront<StripeClient>, String> {
        let secret_key = self.stripe_secret_key.clone().ok_or_else(|| {
            format!(
                "Missing Stripe secret key. Set {} or add it to a .env file next to {}",
                STRIPE_SECRET_KEY_ENV,
                self.manifest_path.display()
            )
        })?;

        let client = StripeClient::new(secret_key)
            .with_api_base(&self.config.stripe.api_base)
            .map_err(|e| e.to_string())?;
        if client.is_test_mode() {
            println!("{} {}", style("!").yellow(), style("Using a Stripe test key").dim());
        }

        Storefront::new(client, self.config.clone()).map_err(|e| e.to_string())
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Ignite Shop - statically regenerated Stripe storefront", long_about = None)]
struct Opts {
    /// Path to the storefront.yaml manifest file (default: ./storefront.yaml)
    #[arg(
        long = "manifest-path",
        short = 'm',
        global = true,
        default_value = "./storefront.yaml"
    )]
    manifest_path: PathBuf,

    /// Stripe secret key
    #[arg(long = "stripe-secret-key", global = true, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    stripe_secret_key: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Pre-render the storefront and serve it
    Serve(serve::ServeCommand),
    /// Write the pre-rendered pages as static files
    Build(build::BuildCommand),
    /// Start a checkout against a running storefront and open it
    Checkout(checkout::CheckoutCommand),
}

#[tokio::main]
async fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    init_tracing();

    // Get the directory containing the manifest file
    let manifest_dir = opts
        .manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    // Load environment variables from .env file in manifest directory
    load_env_file(&manifest_dir);

    let config = match StorefrontConfig::load_or_default(&opts.manifest_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), e);
            process::exit(1);
        }
    };

    // The .env file is read after argument parsing
    let stripe_secret_key = opts
        .stripe_secret_key
        .clone()
        .or_else(|| std::env::var(STRIPE_SECRET_KEY_ENV).ok())
        .filter(|key| !key.trim().is_empty());

    let ctx = Context {
        manifest_path: opts.manifest_path.clone(),
        config,
        stripe_secret_key,
    };

    if let Err(e) = handle_command(opts, &ctx).await {
        eprintln!("{} {}", style("Error:").red(), e);
        process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load environment variables from .env file in the manifest directory
fn load_env_file(manifest_dir: &Path) {
    let env_file_path = manifest_dir.join(".env");

    match dotenvy::from_path(&env_file_path) {
        Ok(_) => {
            eprintln!("✓ Loaded environment from {}", env_file_path.display());
        }
        Err(e) if e.not_found() => {
            // .env file not found is fine, just continue silently
        }
        Err(e) => {
            eprintln!(
                "Warning: Failed to load .env file at {}: {}",
                env_file_path.display(),
                e
            );
        }
    }
}

async fn handle_command(opts: Opts, ctx: &Context) -> Result<(), String> {
    match opts.command {
        Command::Serve(cmd) => cmd.execute(ctx).await,
        Command::Build(cmd) => cmd.execute(ctx).await,
        Command::Checkout(cmd) => cmd.execute(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let opts = Opts::try_parse_from([
            "ignite-shop",
            "-m",
            "shop/storefront.yaml",
            "serve",
            "--port",
            "4000",
        ])
        .unwrap();
        assert_eq!(opts.manifest_path, PathBuf::from("shop/storefront.yaml"));
        assert_eq!(
            opts.command,
            Command::Serve(serve::ServeCommand {
                port: 4000,
                host: "127.0.0.1".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_build_defaults() {
        let opts = Opts::try_parse_from(["ignite-shop", "build"]).unwrap();
        assert_eq!(opts.manifest_path, PathBuf::from("./storefront.yaml"));
        assert_eq!(
            opts.command,
            Command::Build(build::BuildCommand {
                out_dir: PathBuf::from("out"),
            })
        );
    }

    #[test]
    fn test_parse_checkout() {
        let opts = Opts::try_parse_from([
            "ignite-shop",
            "checkout",
            "price_1",
            "--url",
            "http://shop.local:8080",
            "--no-open",
        ])
        .unwrap();
        assert_eq!(
            opts.command,
            Command::Checkout(checkout::CheckoutCommand {
                price_id: "price_1".to_string(),
                url: url::Url::parse("http://shop.local:8080").unwrap(),
                no_open: true,
            })
        );

        let invalid_url = ["ignite-shop", "checkout", "price_1", "--url", "nope"];
        assert!(Opts::try_parse_from(invalid_url).is_err());
    }

    #[test]
    fn test_missing_secret_key_is_reported() {
        let ctx = Context {
            manifest_path: PathBuf::from("./storefront.yaml"),
            config: StorefrontConfig::default(),
            stripe_secret_key: None,
        };
        let error = ctx.storefront().err().unwrap();
        assert!(error.contains(STRIPE_SECRET_KEY_ENV));
    }
}
