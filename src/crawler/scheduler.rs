//! Scheduler that drives a run to completion
//!
//! This module handles:
//! - The fixed, ordered list of page targets
//! - Global concurrency limiting via a semaphore
//! - Per-domain concurrency limiting via one semaphore per host
//! - Optional re-dispatch of failed pages
//! - Waiting for every dispatched worker before returning (drain)

use crate::config::Config;
use crate::crawler::{
    CancelFlag, Extractor, FetchOutcome, FetchWorker, HttpFetcher, ListingExtractor, PageFetcher,
};
use crate::output::CrawlStats;
use crate::state::{PageCache, Record, ResultSink, TokenBucket};
use crate::url::{page_targets, PageTarget};
use crate::ScrapeError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Everything a finished run produced
#[derive(Debug)]
pub struct CrawlReport {
    /// Records from every page that was fetched or served from cache, in
    /// completion order
    pub records: Vec<Record>,

    pub stats: CrawlStats,
}

/// A target waiting for a slot, with the number of times it already failed
#[derive(Debug)]
struct Dispatch {
    target: PageTarget,
    attempt: u32,
}

/// Both permits a running worker holds; dropping it frees the slots
struct Slots {
    _global: OwnedSemaphorePermit,
    _domain: OwnedSemaphorePermit,
}

/// Lazily created semaphore per host
struct DomainLimiter {
    max_per_domain: usize,
    semaphores: HashMap<String, Arc<Semaphore>>,
}

impl DomainLimiter {
    fn new(max_per_domain: usize) -> Self {
        Self {
            max_per_domain,
            semaphores: HashMap::new(),
        }
    }

    fn try_acquire(&mut self, domain: &str) -> Option<OwnedSemaphorePermit> {
        let max = self.max_per_domain;
        let semaphore = self
            .semaphores
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(max)));

        Arc::clone(semaphore).try_acquire_owned().ok()
    }
}

/// Owns a run: its targets, its shared state and its concurrency limits
///
/// The token bucket, page cache and result sink are created here and shared
/// with the worker by `Arc`. Running consumes the scheduler.
pub struct CrawlScheduler {
    targets: Vec<PageTarget>,
    worker: Arc<FetchWorker>,
    cache: Arc<PageCache>,
    sink: Arc<ResultSink>,
    global: Arc<Semaphore>,
    domains: DomainLimiter,
    max_redispatch: u32,
    cancel: CancelFlag,
}

impl CrawlScheduler {
    /// Creates a scheduler using the network and the configured selectors
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        let targets = page_targets(&config.target.url_template, config.target.page_count)?;
        let fetcher = Arc::new(HttpFetcher::from_config(config)?);
        let extractor = Arc::new(ListingExtractor::from_config(&config.extract)?);

        Ok(Self::new(config, targets, fetcher, extractor))
    }

    /// Creates a scheduler over explicit targets and collaborators
    pub fn new(
        config: &Config,
        targets: Vec<PageTarget>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let bucket = Arc::new(TokenBucket::from_config(&config.rate_limit));
        let cache = Arc::new(PageCache::new());
        let sink = Arc::new(ResultSink::new());
        let cancel = CancelFlag::new();

        let mut worker = FetchWorker::new(
            bucket,
            Arc::clone(&cache),
            Arc::clone(&sink),
            fetcher,
            extractor,
        )
        .with_cache_enabled(config.crawler.cache_enabled)
        .with_cancel_flag(cancel.clone());

        if config.crawler.respect_robots {
            worker = worker.with_robots(&config.user_agent.value);
        }

        // Zero would never dispatch anything
        let max_global = config.crawler.max_concurrent_pages_open.max(1) as usize;
        let max_per_domain = config.crawler.max_domain_concurrency.max(1) as usize;

        Self {
            targets,
            worker: Arc::new(worker),
            cache,
            sink,
            global: Arc::new(Semaphore::new(max_global)),
            domains: DomainLimiter::new(max_per_domain),
            max_redispatch: config.crawler.max_redispatch,
            cancel,
        }
    }

    pub fn targets(&self) -> &[PageTarget] {
        &self.targets
    }

    /// The run's page cache, e.g. to seed it before running
    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    /// Flag that stops workers from starting new fetches
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs every target and waits for all workers to finish
    ///
    /// Records become visible only in the returned report. Individual page
    /// failures are counted, never propagated.
    pub async fn run(mut self) -> CrawlReport {
        let start = Instant::now();
        let mut stats = CrawlStats {
            pages: self.targets.len(),
            ..CrawlStats::default()
        };

        let mut pending: VecDeque<Dispatch> = std::mem::take(&mut self.targets)
            .into_iter()
            .map(|target| Dispatch { target, attempt: 0 })
            .collect();
        let mut in_flight: JoinSet<(Dispatch, FetchOutcome)> = JoinSet::new();

        tracing::info!("Starting crawl of {} pages", stats.pages);

        loop {
            if let Some((dispatch, slots)) = self.next_ready(&mut pending) {
                tracing::debug!(
                    "Dispatching page {}: {}",
                    dispatch.target.page,
                    dispatch.target.url
                );
                let worker = Arc::clone(&self.worker);
                in_flight.spawn(async move {
                    let _slots = slots;
                    let outcome = worker.process(&dispatch.target).await;
                    (dispatch, outcome)
                });
                continue;
            }

            match in_flight.join_next().await {
                Some(Ok((dispatch, outcome))) => {
                    stats.record(&outcome);

                    let retry = outcome.is_failure()
                        && dispatch.attempt < self.max_redispatch
                        && !self.cancel.is_cancelled();
                    if retry {
                        tracing::info!(
                            "Re-dispatching page {} (attempt {})",
                            dispatch.target.page,
                            dispatch.attempt + 2
                        );
                        stats.redispatched += 1;
                        pending.push_back(Dispatch {
                            target: dispatch.target,
                            attempt: dispatch.attempt + 1,
                        });
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("Fetch worker panicked: {}", e);
                    stats.completed += 1;
                    stats.failed += 1;
                }
                None if pending.is_empty() => break,
                None => {
                    // Every permit is free here, so a non-empty queue would have dispatched
                    tracing::error!("{} pages could not be scheduled", pending.len());
                    break;
                }
            }
        }

        stats.records = self.sink.len();
        stats.elapsed = start.elapsed();

        tracing::info!(
            "Crawl completed: {} pages, {} records in {:?}",
            stats.completed,
            stats.records,
            stats.elapsed
        );

        CrawlReport {
            records: self.sink.snapshot(),
            stats,
        }
    }

    /// Takes the first queued target whose domain has a free slot
    ///
    /// Targets of saturated domains keep their place in the queue.
    fn next_ready(&mut self, pending: &mut VecDeque<Dispatch>) -> Option<(Dispatch, Slots)> {
        if pending.is_empty() {
            return None;
        }

        let global = Arc::clone(&self.global).try_acquire_owned().ok()?;

        for index in 0..pending.len() {
            if let Some(domain) = self.domains.try_acquire(&pending[index].target.domain) {
                let dispatch = pending.remove(index)?;
                return Some((
                    dispatch,
                    Slots {
                        _global: global,
                        _domain: domain,
                    },
                ));
            }
        }

        None
    }
}
