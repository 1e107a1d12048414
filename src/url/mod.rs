//! URL handling module for Listing-Ripple
//!
//! This module expands the listing URL template into the fixed list of page
//! targets and extracts the domain each target is throttled under.

mod domain;

pub use domain::extract_domain;

use crate::{UrlError, UrlResult};
use url::Url;

/// Placeholder replaced by the page number in a URL template
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// One page of the listing, ready to be dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    /// 1-based page number
    pub page: u32,

    /// Fully rendered request URL
    pub url: Url,

    /// Lowercase host the per-domain limit is keyed on
    pub domain: String,
}

impl PageTarget {
    /// Builds a target from an already rendered URL
    pub fn new(page: u32, url: Url) -> UrlResult<Self> {
        let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
        Ok(Self { page, url, domain })
    }

    /// The request URL as a string, which is also the cache key
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Renders the URL of one page from a template
///
/// # Errors
///
/// Fails when the template has no `{page}` placeholder, does not parse as a
/// URL, or is not HTTP(S).
///
/// # Examples
///
/// ```
/// use listing_ripple::url::render_page_url;
///
/// let url = render_page_url("https://example.com/search?q=gifts&page={page}", 3).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/search?q=gifts&page=3");
/// ```
pub fn render_page_url(template: &str, page: u32) -> UrlResult<Url> {
    if !template.contains(PAGE_PLACEHOLDER) {
        return Err(UrlError::MissingPlaceholder(template.to_string()));
    }

    let rendered = template.replace(PAGE_PLACEHOLDER, &page.to_string());
    let url = Url::parse(&rendered).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

/// Enumerates pages `1..=page_count` of the listing in order
pub fn page_targets(template: &str, page_count: u32) -> UrlResult<Vec<PageTarget>> {
    (1..=page_count)
        .map(|page| PageTarget::new(page, render_page_url(template, page)?))
        .collect()
}
