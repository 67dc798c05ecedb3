//! List command: enumerate qualifying entries without downloading

use crate::fetcher::pagination::{CatalogPager, PageStep};
use crate::fetcher::shared_resources::http_client_for;
use crate::fetcher::{CatalogHttpClient, CatalogSource, FetcherError};
use crate::shutdown::SharedShutdown;
use crate::CatalogEntry;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::{Cli, CliError, OutputFormat};

/// List command arguments
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Stop after this many pages
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,
}

/// Qualifying entries found by a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogListing {
    /// Non-empty pages read
    pub pages: u32,
    /// Entries seen across those pages
    pub entries_seen: u64,
    /// Entries meeting the threshold, in catalog order
    pub qualifying: Vec<ListedEntry>,
    /// Whether the listing stopped before the end of the catalog
    pub truncated: bool,
}

/// One qualifying entry and the page it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    /// Page index
    pub page: u32,
    /// The entry
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

/// Walk the catalog collecting entries with popularity `>= threshold`
///
/// Ends on the first empty page, after `max_pages` pages, or when `shutdown`
/// is requested. A page that cannot be fetched fails the whole listing.
pub async fn list_catalog(
    source: Arc<dyn CatalogSource>,
    threshold: u64,
    max_pages: Option<u32>,
    shutdown: Option<SharedShutdown>,
) -> Result<CatalogListing, FetcherError> {
    let mut pager = CatalogPager::new(source);
    let mut listing = CatalogListing::default();

    loop {
        if max_pages.is_some_and(|max| listing.pages >= max)
            || shutdown.as_ref().is_some_and(|s| s.is_shutdown_requested())
        {
            listing.truncated = true;
            return Ok(listing);
        }

        match pager.next_page().await {
            PageStep::Entries(page) => {
                listing.pages += 1;
                listing.entries_seen += page.len() as u64;
                listing.qualifying.extend(page.qualifying(threshold).map(|entry| ListedEntry {
                    page: page.index,
                    entry: entry.clone(),
                }));
            }
            PageStep::End => return Ok(listing),
            PageStep::Failed(e) => return Err(e),
        }
    }
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<CatalogListing, CliError> {
        let config = cli.harvest_config();
        config.validate()?;

        let client = http_client_for(config.request_timeout)
            .map_err(|e| CliError::ConfigurationError(format!("HTTP client: {e}")))?;
        let source = Arc::new(CatalogHttpClient::from_config(&config, client));

        info!(catalog = %config.catalog_url, threshold = config.threshold, "Listing catalog");
        let listing = list_catalog(source, config.threshold, self.max_pages, Some(shutdown)).await?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
            OutputFormat::Human => {
                println!(
                    "Found {} qualifying entries in {} pages:\n",
                    listing.qualifying.len(),
                    listing.pages
                );
                for listed in &listing.qualifying {
                    println!(
                        "{} | {} | popularity={} | {}",
                        listed.entry.slug,
                        listed.entry.version,
                        listed.entry.popularity,
                        listed.entry.download_link
                    );
                }
                if listing.truncated {
                    println!("\n(listing stopped before the end of the catalog)");
                }
            }
        }

        Ok(listing)
    }
}
