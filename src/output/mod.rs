//! Output module for persisting crawl results
//!
//! This module handles:
//! - Writing the result set as CSV
//! - Optional de-duplication by (name, price)
//! - Recording and printing run statistics

pub mod stats;
mod writer;

pub use stats::{print_statistics, CrawlStats};
pub use writer::{dedupe_records, write_csv, write_records};
