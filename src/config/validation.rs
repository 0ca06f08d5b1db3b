use crate::config::types::{Config, CrawlConfig, OutputConfig, RendererConfig};
use crate::ConfigError;
use regex::RegexBuilder;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;

    if config.follow_fragment {
        validate_fragment_prefix(&config.fragment_prefix)?;
    }

    if let Some(selector) = &config.ready_selector {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ready-selector cannot be empty; omit it to capture on load".to_string(),
            ));
        }
    }

    for pattern in &config.exclude {
        validate_exclude_pattern(pattern)?;
    }

    if config.poll_interval == 0 {
        return Err(ConfigError::Validation(
            "poll-interval must be greater than 0ms".to_string(),
        ));
    }

    if config.wait_delay < config.poll_interval {
        return Err(ConfigError::Validation(format!(
            "wait-delay ({}ms) must be >= poll-interval ({}ms)",
            config.wait_delay, config.poll_interval
        )));
    }

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-pages must be between 1 and 64, got {}",
            config.max_concurrent_pages
        )));
    }

    Ok(())
}

/// Validates that the base URL is an absolute http(s) URL with a host
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            base_url
        )));
    }

    Ok(())
}

/// Validates the fragment route prefix
fn validate_fragment_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation(
            "fragment-prefix cannot be empty when follow-fragment is set".to_string(),
        ));
    }

    if prefix.contains('/') || prefix.contains('#') {
        return Err(ConfigError::Validation(format!(
            "fragment-prefix '{}' cannot contain '/' or '#'",
            prefix
        )));
    }

    Ok(())
}

/// Validates that an exclude pattern compiles as a case-insensitive regex
fn validate_exclude_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Exclude pattern cannot be empty".to_string(),
        ));
    }

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-empty, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.content && config.content_dir.is_empty() {
        return Err(ConfigError::Validation(
            "content-dir cannot be empty when content is enabled".to_string(),
        ));
    }

    if config.sitemap && config.sitemap_dir.is_empty() {
        return Err(ConfigError::Validation(
            "sitemap-dir cannot be empty when sitemap is enabled".to_string(),
        ));
    }

    if config.render && config.render_dir.is_empty() {
        return Err(ConfigError::Validation(
            "render-dir cannot be empty when render is enabled".to_string(),
        ));
    }

    Ok(())
}
