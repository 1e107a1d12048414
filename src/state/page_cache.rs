use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A fetched page body and when it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Run-scoped page store keyed by request URL
///
/// Entries never expire during a run and there is no eviction: the page set
/// is fixed and small. A later `store` for the same URL replaces the entry.
///
/// Workers that may fetch a URL hold its fill lock from lookup to store, so a
/// URL is fetched over the network at most once per run.
#[derive(Debug, Default)]
pub struct PageCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    fills: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached body for `url`, if any
    pub fn lookup(&self, url: &str) -> Option<String> {
        self.lock().get(url).map(|entry| entry.body.clone())
    }

    /// Returns the full entry for `url`, including its fetch time
    pub fn entry(&self, url: &str) -> Option<CacheEntry> {
        self.lock().get(url).cloned()
    }

    /// Inserts or overwrites the entry for `url`
    pub fn store(&self, url: &str, body: String) {
        let entry = CacheEntry {
            body,
            fetched_at: Utc::now(),
        };
        self.lock().insert(url.to_string(), entry);
    }

    /// Drops the entry for `url` so the next worker fetches it again
    pub fn invalidate(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    /// Waits for exclusive right to fill `url`
    ///
    /// A second caller for the same URL resumes once the first drops its
    /// guard, and then sees the stored body. After a failed fetch nothing is
    /// stored and the next holder fetches again.
    pub async fn fill_lock(&self, url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut fills = self.fills.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(fills.entry(url.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
