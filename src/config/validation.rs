use crate::config::types::{
    Config, CrawlerConfig, ExtractConfig, OutputConfig, RateLimitConfig, TargetConfig,
    UserAgentConfig,
};
use crate::url::render_page_url;
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extract_config(&config.extract)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    if config.page_count < 1 {
        return Err(ConfigError::Validation(format!(
            "page_count must be >= 1, got {}",
            config.page_count
        )));
    }

    // Rendering page 1 checks the placeholder, the URL syntax and the scheme
    render_page_url(&config.url_template, 1)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_template: {}", e)))?;

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages_open < 1 || config.max_concurrent_pages_open > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages_open must be between 1 and 100, got {}",
            config.max_concurrent_pages_open
        )));
    }

    if config.max_domain_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "max_domain_concurrency must be >= 1, got {}",
            config.max_domain_concurrency
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit capacity must be >= 1, got {}",
            config.capacity
        )));
    }

    if config.refill_window < 1 {
        return Err(ConfigError::Validation(
            "rate-limit refill_window must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    // Must be a legal header value
    if config.value.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent value cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    let selectors = [
        Some(&config.listing),
        Some(&config.name),
        Some(&config.comments),
        config.rating.as_ref(),
        Some(&config.price),
        Some(&config.symbol),
    ];

    for selector in selectors.into_iter().flatten() {
        validate_selector(selector)?;
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
