use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig, SiteEntry};
use crate::url::normalize_site_root;
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

const MAX_BATCH_SIZE: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.parallelism < 1 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be >= 1, got {}",
            config.parallelism
        )));
    }

    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(referrer) = &config.referrer {
        Url::parse(referrer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referrer '{}': {}", referrer, e)))?;
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site list
///
/// Duplicate roots are compared after normalization, so `https://a.com` and
/// `https://a.com/` count as the same site.
fn validate_sites(sites: &[SiteEntry]) -> ConfigResult<()> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let root = normalize_site_root(&site.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e)))?;

        if !seen.insert(root.to_string()) {
            return Err(ConfigError::Validation(format!(
                "Site '{}' is configured more than once",
                root
            )));
        }
    }

    Ok(())
}
