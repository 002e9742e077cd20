use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SeedEntry, SourceRule, SubdirectoryRule,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::path::Component;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seeds(&config.seeds)?;
    validate_output_config(&config.output)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_sources(&config.sources)?;
    validate_sources(&config.recursive_sources)?;
    Ok(())
}

/// Validates seed URLs: at least one, each absolute with a fetchable scheme
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed.url()).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed.url(), e))
        })?;

        if !matches!(url.scheme(), "http" | "https" | "file") {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http, https or file scheme",
                seed.url()
            )));
        }

        if let Some(filename) = seed.filename() {
            validate_plain_filename("seed filename", filename)?;
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    validate_plain_filename("default_filename", &config.default_filename)?;

    for rule in &config.subdirectories {
        validate_subdirectory(rule)?;
    }

    Ok(())
}

fn validate_subdirectory(rule: &SubdirectoryRule) -> Result<(), ConfigError> {
    let directory = std::path::Path::new(&rule.directory);
    let is_relative_and_contained = !rule.directory.is_empty()
        && directory
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if !is_relative_and_contained {
        return Err(ConfigError::Validation(format!(
            "subdirectory '{}' must be a relative path without '..'",
            rule.directory
        )));
    }

    if rule.extensions.is_empty() {
        return Err(ConfigError::Validation(format!(
            "subdirectory '{}' must list at least one extension",
            rule.directory
        )));
    }

    for extension in &rule.extensions {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "extension '{}' for subdirectory '{}' must start with '.'",
                extension, rule.directory
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "request_concurrency must be >= 1 when set".to_string(),
        ));
    }

    if config.root_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "root_concurrency must be >= 1, got {}",
            config.root_concurrency
        )));
    }

    for pattern in &config.url_filter {
        validate_host_pattern(pattern)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Every selector must parse; attribute names must not be blank
fn validate_sources(rules: &[SourceRule]) -> Result<(), ConfigError> {
    for rule in rules {
        Selector::parse(&rule.selector).map_err(|e| ConfigError::InvalidSelector {
            selector: rule.selector.clone(),
            message: format!("{:?}", e),
        })?;

        if matches!(&rule.attr, Some(attr) if attr.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "source rule '{}' has an empty attribute",
                rule.selector
            )));
        }
    }
    Ok(())
}

/// A file name must be non-empty and must not contain path separators
fn validate_plain_filename(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".."
    {
        return Err(ConfigError::Validation(format!(
            "{} must be a plain file name, got '{}'",
            field, name
        )));
    }
    Ok(())
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' has a misplaced dot",
            host
        )));
    }

    Ok(())
}
