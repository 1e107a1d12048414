//! Statistics collected while a run drains
//!
//! The scheduler feeds every worker outcome into [`CrawlStats`]; the binary
//! prints them once the CSV has been written.

use crate::crawler::FetchOutcome;
use std::time::Duration;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Targets the run started with
    pub pages: usize,

    /// Worker completion signals, one per dispatch including re-dispatches
    pub completed: usize,

    /// Pages fetched over the network
    pub fetched: usize,

    /// Pages served from the page cache
    pub cached: usize,

    /// Dispatches that ended in a network error or error status
    pub failed: usize,

    /// Pages skipped because robots.txt disallowed them
    pub disallowed: usize,

    /// Dispatches skipped because the run was cancelled
    pub cancelled: usize,

    /// Failed pages handed back to the queue
    pub redispatched: usize,

    /// Records in the result set
    pub records: usize,

    pub elapsed: Duration,
}

impl CrawlStats {
    /// Counts one completion signal
    pub fn record(&mut self, outcome: &FetchOutcome) {
        self.completed += 1;
        match outcome {
            FetchOutcome::Fetched { .. } => self.fetched += 1,
            FetchOutcome::Cached { .. } => self.cached += 1,
            FetchOutcome::Failed { .. } => self.failed += 1,
            FetchOutcome::Disallowed => self.disallowed += 1,
            FetchOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Share of completions that produced a page (fetched or cached), in percent
    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        (self.fetched + self.cached) as f64 / self.completed as f64 * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Targets: {}", stats.pages);
    println!("  Fetched: {}", stats.fetched);
    println!("  From cache: {}", stats.cached);
    println!("  Failed: {}", stats.failed);
    if stats.disallowed > 0 {
        println!("  Disallowed by robots.txt: {}", stats.disallowed);
    }
    if stats.cancelled > 0 {
        println!("  Cancelled: {}", stats.cancelled);
    }
    if stats.redispatched > 0 {
        println!("  Re-dispatched: {}", stats.redispatched);
    }
    println!();

    println!("Records: {}", stats.records);
    println!("Elapsed: {:.2?}", stats.elapsed);
    println!(
        "Success Rate: {:.1}% ({} / {} dispatches produced a page)",
        stats.success_rate(),
        stats.fetched + stats.cached,
        stats.completed
    );
}
