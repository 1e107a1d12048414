//! Robots.txt handling module
//!
//! Each host's robots.txt is fetched at most once per run, the first time a
//! page on that host misses the cache. Later checks reuse the parsed file.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::PageFetcher;
use crate::url::PageTarget;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use url::Url;

/// Per-run robots.txt policy for one user agent
#[derive(Debug)]
pub struct RobotsPolicy {
    agent_token: String,
    hosts: Mutex<HashMap<String, Arc<OnceCell<ParsedRobots>>>>,
}

impl RobotsPolicy {
    pub fn new(user_agent: &str) -> Self {
        Self {
            agent_token: product_token(user_agent).to_string(),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether the target may be fetched, loading robots.txt on first use
    ///
    /// Concurrent callers for the same host wait on a single robots.txt fetch.
    pub async fn is_allowed(&self, target: &PageTarget, fetcher: &dyn PageFetcher) -> bool {
        let cell = {
            let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(hosts.entry(target.domain.clone()).or_default())
        };

        let robots = cell
            .get_or_init(|| fetch_robots(fetcher, &target.url))
            .await;

        robots.is_allowed(target.as_str(), &self.agent_token)
    }
}

/// Fetches and parses robots.txt for the host of `page_url`
///
/// A missing file, an error status or a network failure all mean "allow all".
pub async fn fetch_robots(fetcher: &dyn PageFetcher, page_url: &Url) -> ParsedRobots {
    let robots_url = match page_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL for {}: {}", page_url, e);
            return ParsedRobots::allow_all();
        }
    };

    tracing::debug!("Fetching {}", robots_url);
    match fetcher.fetch(robots_url.as_str()).await {
        Ok(page) if page.is_success() => ParsedRobots::from_content(&page.body),
        Ok(page) => {
            tracing::debug!(
                "{} returned HTTP {}, allowing all",
                robots_url,
                page.status
            );
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}, allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Product token of a User-Agent string, which is what robots.txt groups name
///
/// `"Mozilla/5.0 (Windows NT 10.0)"` becomes `"Mozilla"`.
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or(user_agent)
}
