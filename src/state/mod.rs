//! Run-scoped state shared between fetch workers
//!
//! # Components
//!
//! - `TokenBucket`: admission control for outbound requests
//! - `PageCache`: page bodies already fetched during this run
//! - `ResultSink`: records extracted so far
//! - `Record`: one product listing
//!
//! Each structure is created once per run, owned by the scheduler and shared
//! with workers through `Arc`. Each guards its data with one mutex.

mod page_cache;
mod record;
mod result_sink;
mod token_bucket;

pub use page_cache::{CacheEntry, PageCache};
pub use record::{Record, CSV_HEADER};
pub use result_sink::ResultSink;
pub use token_bucket::TokenBucket;
