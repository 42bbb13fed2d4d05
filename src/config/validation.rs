use crate::config::types::{Config, CrawlerConfig};
use crate::url::normalize;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_seeds(&config.crawler.seeds)?;
    Ok(())
}

/// Validates crawler limits, identity and network settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "maxPages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "userAgent cannot be empty".to_string(),
        ));
    }

    if config.fetch_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "fetchRetries must be >= 1, got {}",
            config.fetch_retries
        )));
    }

    if config.proxy_port.is_some() && config.proxy_host.is_none() {
        return Err(ConfigError::Validation(
            "proxyPort is set but proxyHost is missing".to_string(),
        ));
    }

    if config.proxy_host.is_some() && config.proxy_port.is_none() {
        return Err(ConfigError::Validation(
            "proxyHost is set but proxyPort is missing".to_string(),
        ));
    }

    if config.supervisor_tick_ms == 0 {
        return Err(ConfigError::Validation(
            "supervisorTickMs must be > 0".to_string(),
        ));
    }

    if config.metrics_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "metricsIntervalSecs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every seed is an absolute http(s) URL once normalized
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let normalized = normalize(seed);
        let url = Url::parse(&normalized)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}
