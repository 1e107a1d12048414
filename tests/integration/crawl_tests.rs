//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and run the full
//! fetch, extract and CSV export cycle end-to-end.

use listing_ripple::config::{
    Config, CrawlerConfig, ExtractConfig, OutputConfig, RateLimitConfig, TargetConfig,
    UserAgentConfig,
};
use listing_ripple::crawler::{crawl, CrawlScheduler, HttpFetcher, ListingExtractor};
use listing_ripple::output::write_csv;
use listing_ripple::state::Record;
use listing_ripple::url::{page_targets, PageTarget};
use listing_ripple::ScrapeError;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_AGENT: &str = "ListingRippleTest/1.0";

/// Creates a test configuration pointing at the mock server
fn create_test_config(url_template: String, page_count: u32, csv_path: &str) -> Config {
    Config {
        target: TargetConfig {
            url_template,
            page_count,
        },
        crawler: CrawlerConfig {
            max_concurrent_pages_open: 4,
            max_domain_concurrency: 2,
            cache_enabled: true,
            respect_robots: true,
            max_redispatch: 0,
            request_timeout: 5,
        },
        rate_limit: RateLimitConfig {
            capacity: 100,
            refill_window: 50,
        },
        user_agent: UserAgentConfig {
            value: TEST_AGENT.to_string(),
        },
        extract: ExtractConfig::default(),
        output: OutputConfig {
            csv_path: csv_path.to_string(),
            dedupe: false,
        },
    }
}

fn search_template(server: &MockServer) -> String {
    format!("{}/search?page={{page}}", server.uri())
}

/// One listing card in the default markup
fn card(name: &str, comments: &str, price: &str) -> String {
    format!(
        r#"<li><div class="v2-listing-card__info">
            <h3>{}</h3>
            <div><div><span>{}</span></div></div>
            <div class="n-listing-card__price">
                <p class="wt-text-title-01"><span class="currency-symbol">$</span><span class="currency-value">{}</span></p>
            </div>
        </div></li>"#,
        name, comments, price
    )
}

fn listing_page(cards: &[String]) -> String {
    format!(
        r#"<html><head><title>Search</title></head><body>
        <div class="search-listings-group"><div data-search-results-container><ol>{}</ol></div></div>
        </body></html>"#,
        cards.concat()
    )
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_csv() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let csv_path = temp_dir.path().join("listings.csv");

    mount_page(
        &mock_server,
        1,
        listing_page(&[
            card("Walnut Cutting Board 4.9", "(312)", "45.00"),
            card("Olive Wood Spoon 4.7", "(58)", "12.50"),
        ]),
    )
    .await;
    mount_page(
        &mock_server,
        2,
        listing_page(&[card("Maple Serving Tray 5.0", "(9)", "38.00")]),
    )
    .await;
    mount_page(&mock_server, 3, listing_page(&[])).await;

    let config = create_test_config(
        search_template(&mock_server),
        3,
        csv_path.to_str().unwrap(),
    );

    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.stats.pages, 3);
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.records, 3);

    let mut names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "Maple Serving Tray 5.0",
            "Olive Wood Spoon 4.7",
            "Walnut Cutting Board 4.9"
        ]
    );

    let tray = report
        .records
        .iter()
        .find(|r| r.name.starts_with("Maple"))
        .unwrap();
    assert_eq!(tray.comment_count, "(9)");
    assert_eq!(tray.rating, " 5.0");
    assert_eq!(tray.price, "38.00");
    assert_eq!(tray.currency_symbol, "$");

    write_csv(&csv_path, &report.records).expect("Failed to write CSV");

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("name,comments,rate,price,symbol"));
    assert_eq!(lines.count(), 3);
    assert!(contents.contains("Maple Serving Tray 5.0,(9), 5.0,38.00,$"));
}

#[tokio::test]
async fn test_failed_page_does_not_abort_run() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        1,
        listing_page(&[card("Linen Apron 4.6", "(40)", "28.00")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(search_template(&mock_server), 2, "unused.csv");
    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].name, "Linen Apron 4.6");
    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.completed, 2);
}

#[tokio::test]
async fn test_failed_page_redispatched() {
    let mock_server = MockServer::start().await;

    // First request fails, every later one succeeds
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        1,
        listing_page(&[card("Beeswax Candle 4.8", "(77)", "16.00")]),
    )
    .await;

    let mut config = create_test_config(search_template(&mock_server), 1, "unused.csv");
    config.crawler.max_redispatch = 1;

    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.redispatched, 1);
    assert_eq!(report.stats.fetched, 1);
}

#[tokio::test]
async fn test_robots_disallow_skips_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /search\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(search_template(&mock_server), 3, "unused.csv");
    let report = crawl(&config).await.expect("Crawl failed");

    assert!(report.records.is_empty());
    assert_eq!(report.stats.disallowed, 3);
    assert_eq!(report.stats.fetched, 0);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        1,
        listing_page(&[card("Clay Planter 4.5", "(3)", "19.00")]),
    )
    .await;

    let mut config = create_test_config(search_template(&mock_server), 1, "unused.csv");
    config.crawler.respect_robots = false;

    let report = crawl(&config).await.expect("Crawl failed");
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_repeated_page_served_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[card("Felt Coaster Set 4.9", "(120)", "14.00")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(search_template(&mock_server), 1, "unused.csv");
    // Both visits run at once; the second waits for the first to fill the cache
    config.crawler.max_concurrent_pages_open = 2;
    config.crawler.max_domain_concurrency = 2;
    config.crawler.respect_robots = false;

    let url = url::Url::parse(&format!("{}/search?page=1", mock_server.uri())).unwrap();
    let targets = vec![
        PageTarget::new(1, url.clone()).unwrap(),
        PageTarget::new(1, url).unwrap(),
    ];
    let fetcher = Arc::new(HttpFetcher::from_config(&config).unwrap());
    let extractor = Arc::new(ListingExtractor::from_config(&config.extract).unwrap());

    let report = CrawlScheduler::new(&config, targets, fetcher, extractor)
        .run()
        .await;

    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.cached, 1);
    // The cached visit contributes its records again
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("user-agent", TEST_AGENT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[card("Brass Hook 4.4", "(6)", "8.00")])),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(search_template(&mock_server), 2, "unused.csv");
    config.crawler.respect_robots = false;

    let report = crawl(&config).await.expect("Crawl failed");
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_rate_limit_spreads_requests() {
    let mock_server = MockServer::start().await;
    for page in 1..=4 {
        mount_page(&mock_server, page, listing_page(&[])).await;
    }

    let mut config = create_test_config(search_template(&mock_server), 4, "unused.csv");
    config.crawler.respect_robots = false;
    config.rate_limit = RateLimitConfig {
        capacity: 2,
        refill_window: 100,
    };

    let start = std::time::Instant::now();
    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.stats.fetched, 4);
    // Two requests fit in the first window, the other two wait for a refill
    assert!(start.elapsed() >= std::time::Duration::from_millis(100));
}

#[tokio::test]
async fn test_invalid_template_rejected() {
    let config = create_test_config("https://shop.test/search".to_string(), 1, "unused.csv");
    let result = crawl(&config).await;
    assert!(matches!(result, Err(ScrapeError::UrlError(_))));
}

#[test]
fn test_csv_to_missing_directory_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    let csv_path = temp_dir.path().join("missing").join("out.csv");
    let records = vec![Record {
        name: "Ceramic Bowl 4.8".to_string(),
        ..Record::default()
    }];

    let result = write_csv(&csv_path, &records);
    assert!(matches!(result, Err(ScrapeError::Output { .. })));
}

#[test]
fn test_page_targets_follow_template() {
    let targets = page_targets("https://shop.test/c/art?page={page}&ref=pagination", 3).unwrap();
    let urls: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://shop.test/c/art?page=1&ref=pagination",
            "https://shop.test/c/art?page=2&ref=pagination",
            "https://shop.test/c/art?page=3&ref=pagination",
        ]
    );
}
