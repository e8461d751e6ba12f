//! Catalog search command.

use tokio::runtime::Runtime;

use crate::catalog::{CatalogError, DeezerClient};
use crate::config::Config;

/// Print the best catalog match for a title
pub fn cmd_search(rt: &Runtime, config: &Config, title: &str) -> anyhow::Result<()> {
    let client = DeezerClient::with_config(&config.catalog);

    rt.block_on(async {
        match client.search(title).await {
            Ok(Some(track)) => {
                println!("✓ {}", track.display_title());
                println!();
                println!("  Title:  {}", track.title);
                println!("  Artist: {}", track.artist);
                println!("  Album:  {}", track.album);
                match &track.cover {
                    Some(cover) => println!("  Cover:  {}", cover),
                    None => println!("  Cover:  (none)"),
                }
                Ok(())
            }
            Ok(None) => {
                println!("✗ No matches for {:?}", title);
                Ok(())
            }
            Err(CatalogError::RateLimited) => {
                anyhow::bail!("catalog rate limit reached, try again in a few seconds")
            }
            Err(e) => Err(anyhow::anyhow!("catalog search failed: {}", e)),
        }
    })
}
