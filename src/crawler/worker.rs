//! Fetch worker: one listing page from token to records
//!
//! For each target the worker:
//! 1. Checks robots.txt, when enabled
//! 2. Waits for a token from the shared bucket
//! 3. Reuses the cached body, or fetches the page and caches it
//! 4. Extracts records and appends them to the shared sink
//!
//! Every path ends in a [`FetchOutcome`]; a failed page never aborts the run.

use crate::crawler::{Extractor, PageFetcher};
use crate::robots::RobotsPolicy;
use crate::state::{PageCache, ResultSink, TokenBucket};
use crate::url::PageTarget;
use crate::FetchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a worker finished one target
#[derive(Debug)]
pub enum FetchOutcome {
    /// Fetched over the network and extracted
    Fetched { records: usize },

    /// Served from the page cache and extracted
    Cached { records: usize },

    /// Network error or non-success status; no records contributed
    Failed { error: FetchError },

    /// Disallowed by robots.txt
    Disallowed,

    /// The run was cancelled before the fetch started
    Cancelled,
}

impl FetchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Records this target contributed to the result set
    pub fn records(&self) -> usize {
        match self {
            Self::Fetched { records } | Self::Cached { records } => *records,
            _ => 0,
        }
    }
}

/// Shared cancellation flag for a run
///
/// Workers check it before starting a fetch; requests already in flight are
/// left to complete.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Processes page targets against the run's shared state
///
/// The bucket, cache and sink are shared by reference with every other
/// worker of the run and only touched through their public operations.
pub struct FetchWorker {
    bucket: Arc<TokenBucket>,
    cache: Arc<PageCache>,
    sink: Arc<ResultSink>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    robots: Option<RobotsPolicy>,
    cache_enabled: bool,
    cancel: CancelFlag,
}

impl FetchWorker {
    /// Creates a worker with caching on and robots.txt ignored
    pub fn new(
        bucket: Arc<TokenBucket>,
        cache: Arc<PageCache>,
        sink: Arc<ResultSink>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            bucket,
            cache,
            sink,
            fetcher,
            extractor,
            robots: None,
            cache_enabled: true,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Checks robots.txt for the given user agent before every target
    pub fn with_robots(mut self, user_agent: &str) -> Self {
        self.robots = Some(RobotsPolicy::new(user_agent));
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one target to completion
    pub async fn process(&self, target: &PageTarget) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            tracing::debug!("Run cancelled, skipping {}", target.url);
            return FetchOutcome::Cancelled;
        }

        // Before the bucket, so a disallowed page costs no token. The robots.txt
        // request itself is not rate limited; it happens once per host.
        if let Some(robots) = &self.robots {
            if !robots.is_allowed(target, self.fetcher.as_ref()).await {
                tracing::info!("URL {} disallowed by robots.txt", target.url);
                return FetchOutcome::Disallowed;
            }
        }

        self.bucket.acquire_blocking().await;

        // The bucket may have kept us waiting for a while
        if self.cancel.is_cancelled() {
            tracing::debug!("Run cancelled, skipping {}", target.url);
            return FetchOutcome::Cancelled;
        }

        let (body, from_cache) = match self.load(target).await {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::warn!("Something went wrong fetching page {}: {}", target.page, error);
                return FetchOutcome::Failed { error };
            }
        };

        let records = self.extractor.extract(&body);
        let count = records.len();
        self.sink.extend(records);

        tracing::info!("{} scraped ({} records)", target.url, count);

        if from_cache {
            FetchOutcome::Cached { records: count }
        } else {
            FetchOutcome::Fetched { records: count }
        }
    }

    /// Returns the page body and whether it came from the cache
    async fn load(&self, target: &PageTarget) -> Result<(String, bool), FetchError> {
        if !self.cache_enabled {
            return Ok((self.fetch(target).await?, false));
        }

        // Held until the body is stored; a concurrent visit of the same URL
        // waits here and then hits the cache
        let _fill = self.cache.fill_lock(target.as_str()).await;

        if let Some(body) = self.cache.lookup(target.as_str()) {
            tracing::debug!("Cache hit for page {}: {}", target.page, target.url);
            return Ok((body, true));
        }

        Ok((self.fetch(target).await?, false))
    }

    async fn fetch(&self, target: &PageTarget) -> Result<String, FetchError> {
        let page = self.fetcher.fetch(target.as_str()).await?;

        if !page.is_success() {
            return Err(FetchError::Status {
                url: target.url.to_string(),
                status: page.status,
            });
        }

        tracing::info!("Page visited: {}", target.url);

        if self.cache_enabled {
            self.cache.store(target.as_str(), page.body.clone());
        }

        Ok(page.body)
    }
}
