//! HTML parser for extracting listing records
//!
//! Every element matched by the listing selector becomes one [`Record`]; the
//! remaining selectors are evaluated inside that element. Missing markup
//! leaves the corresponding field empty rather than failing the page.

use crate::config::ExtractConfig;
use crate::state::Record;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Number of trailing name characters used as the rating when no rating
/// selector is configured
const RATING_SUFFIX_LEN: usize = 4;

/// Turns a page body into records
///
/// Must be pure; workers call it concurrently on different pages.
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &str) -> Vec<Record>;
}

/// Selector-driven extractor for product listing pages
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    listing: Selector,
    name: Selector,
    comments: Selector,
    rating: Option<Selector>,
    price: Selector,
    symbol: Selector,
}

impl ListingExtractor {
    /// Compiles the selectors of an `[extract]` section
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing: compile(&config.listing)?,
            name: compile(&config.name)?,
            comments: compile(&config.comments)?,
            rating: config.rating.as_deref().map(compile).transpose()?,
            price: compile(&config.price)?,
            symbol: compile(&config.symbol)?,
        })
    }

    fn record(&self, card: ElementRef<'_>) -> Record {
        let name = child_text(card, &self.name);
        let rating = match &self.rating {
            Some(selector) => child_text(card, selector),
            None => trailing_chars(&name, RATING_SUFFIX_LEN),
        };

        Record {
            comment_count: child_text(card, &self.comments),
            rating,
            price: child_text(card, &self.price),
            currency_symbol: child_text(card, &self.symbol),
            name,
        }
    }
}

impl Extractor for ListingExtractor {
    fn extract(&self, page: &str) -> Vec<Record> {
        let document = Html::parse_document(page);
        document
            .select(&self.listing)
            .map(|card| self.record(card))
            .collect()
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Text of every descendant matching `selector`, concatenated and trimmed
fn child_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .flat_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Last `n` characters of `s`, or an empty string when `s` is shorter
fn trailing_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    if count < n {
        return String::new();
    }
    s.chars().skip(count - n).collect()
}
