use serde::Deserialize;

/// Main configuration structure for Listing-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// The paginated listing to scrape
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// URL template; `{page}` is replaced by the page number (1-based)
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Number of pages to fetch
    #[serde(rename = "page-count")]
    pub page_count: u32,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrent-pages-open")]
    pub max_concurrent_pages_open: u32,

    /// Maximum number of concurrent page fetches against one domain
    #[serde(rename = "max-domain-concurrency")]
    pub max_domain_concurrency: u32,

    /// Reuse page bodies already fetched during this run
    #[serde(rename = "cache-enabled", default = "default_true")]
    pub cache_enabled: bool,

    /// Skip URLs disallowed by the target's robots.txt
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// How many times a failed URL is handed back to the scheduler
    #[serde(rename = "max-redispatch", default)]
    pub max_redispatch: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Token bucket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per refill window
    pub capacity: u32,

    /// Length of the refill window (milliseconds)
    #[serde(rename = "refill-window")]
    pub refill_window: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value sent in the User-Agent header and matched against robots.txt
    pub value: String,
}

/// CSS selectors used to pull records out of a listing page
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Selects one element per listing card
    #[serde(default = "default_listing_selector")]
    pub listing: String,

    #[serde(default = "default_name_selector")]
    pub name: String,

    #[serde(default = "default_comments_selector")]
    pub comments: String,

    /// When absent the rating is taken from the last four characters of the name
    #[serde(default)]
    pub rating: Option<String>,

    #[serde(default = "default_price_selector")]
    pub price: String,

    #[serde(default = "default_symbol_selector")]
    pub symbol: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            listing: default_listing_selector(),
            name: default_name_selector(),
            comments: default_comments_selector(),
            rating: None,
            price: default_price_selector(),
            symbol: default_symbol_selector(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV file to write
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// Drop records sharing the same name and price before writing
    #[serde(default)]
    pub dedupe: bool,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_listing_selector() -> String {
    "div.search-listings-group div[data-search-results-container] ol li div.v2-listing-card__info"
        .to_string()
}

fn default_name_selector() -> String {
    "h3".to_string()
}

fn default_comments_selector() -> String {
    "div > div > span".to_string()
}

fn default_price_selector() -> String {
    "div.n-listing-card__price p.wt-text-title-01 span.currency-value".to_string()
}

fn default_symbol_selector() -> String {
    "div.n-listing-card__price span.currency-symbol".to_string()
}
