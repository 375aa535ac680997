use std::path::PathBuf;

use console::style;
use ignite_shop_core::export_site;

use crate::Context;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct BuildCommand {
    /// Directory the static site is written to
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,
}

impl BuildCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let storefront = ctx.storefront()?;

        println!("{}", style("Building storefront").dim());
        let summary = export_site(&storefront, &self.out_dir)
            .await
            .map_err(|e| e.to_string())?;

        for page in &summary.pages {
            println!("  {} {}", style("✓").green(), page.display());
        }
        println!(
            "{} {} pages and {} assets written to {}",
            style("✓").green(),
            summary.pages.len(),
            summary.assets.len(),
            style(self.out_dir.display()).cyan()
        );
        Ok(())
    }
}
