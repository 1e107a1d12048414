//! Test doubles for the network and extraction seams

use crate::crawler::{Extractor, FetchedPage, PageFetcher};
use crate::state::Record;
use crate::url::PageTarget;
use crate::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Serves canned responses and records how it was called
///
/// Unknown URLs fail with a connection error. Concurrency is tracked per host
/// while a request is "in flight" (during the configured delay).
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    pages: HashMap<String, (u16, String)>,
    delay: Duration,
    calls: AtomicUsize,
    active: Mutex<HashMap<String, usize>>,
    peak: Mutex<HashMap<String, usize>>,
    active_total: AtomicUsize,
    peak_total: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, target: &PageTarget, status: u16, body: &str) -> Self {
        self.pages
            .insert(target.as_str().to_string(), (status, body.to_string()));
        self
    }

    pub(crate) fn robots(mut self, host: &str, body: &str) -> Self {
        self.pages.insert(
            format!("https://{}/robots.txt", host),
            (200, body.to_string()),
        );
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous requests seen for `host`
    pub(crate) fn peak_for(&self, host: &str) -> usize {
        self.peak.lock().unwrap().get(host).copied().unwrap_or(0)
    }

    /// Highest number of simultaneous requests seen overall
    pub(crate) fn peak_total(&self) -> usize {
        self.peak_total.load(Ordering::SeqCst)
    }

    fn enter(&self, host: &str) {
        let now = {
            let mut active = self.active.lock().unwrap();
            let count = active.entry(host.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let mut peak = self.peak.lock().unwrap();
        let slot = peak.entry(host.to_string()).or_insert(0);
        *slot = (*slot).max(now);

        let total = self.active_total.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_total.fetch_max(total, Ordering::SeqCst);
    }

    fn leave(&self, host: &str) {
        if let Some(count) = self.active.lock().unwrap().get_mut(host) {
            *count -= 1;
        }
        self.active_total.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        self.enter(&host);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.leave(&host);

        match self.pages.get(url) {
            Some((status, body)) => Ok(FetchedPage {
                status: *status,
                body: body.clone(),
            }),
            None => Err(FetchError::Connect {
                url: url.to_string(),
            }),
        }
    }
}

/// Treats every non-empty line of a page as one record name
pub(crate) struct NameExtractor;

impl Extractor for NameExtractor {
    fn extract(&self, page: &str) -> Vec<Record> {
        page.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Record {
                name: line.to_string(),
                ..Record::default()
            })
            .collect()
    }
}
