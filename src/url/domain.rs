use url::Url;

/// Extracts the lowercase host of a URL, which keys the per-domain limit
///
/// The port is ignored, so `example.com:8080` and `example.com` share a limit.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_ripple::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Etsy.com/search?page=2").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.etsy.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
