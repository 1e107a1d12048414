//! Crawler module for fetching listing pages and collecting records
//!
//! This module contains the crawl pipeline:
//! - HTTP fetching behind the `PageFetcher` seam
//! - Record extraction behind the `Extractor` seam
//! - The per-page fetch worker (rate limit, cache, robots, extract)
//! - The scheduler that bounds concurrency and drains the run

mod fetcher;
#[cfg(test)]
pub(crate) mod mock;
mod parser;
mod scheduler;
mod worker;

pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use parser::{Extractor, ListingExtractor};
pub use scheduler::{CrawlReport, CrawlScheduler};
pub use worker::{CancelFlag, FetchOutcome, FetchWorker};

use crate::config::Config;
use crate::ScrapeError;

/// Runs a complete crawl with the real network and the configured selectors
///
/// # Example
///
/// ```no_run
/// use listing_ripple::config::load_config;
/// use listing_ripple::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = crawl(&config).await?;
/// println!("{} records", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config) -> Result<CrawlReport, ScrapeError> {
    let scheduler = CrawlScheduler::from_config(config)?;
    Ok(scheduler.run().await)
}
