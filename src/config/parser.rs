use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// An absent file yields the built-in defaults. When the configuration names
/// an allowed-hosts file, it is read here so the crawl core never touches the
/// filesystem for configuration.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use potator_crawler::config::load_config;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        toml::from_str::<Config>(&content)?
    } else {
        tracing::warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        Config::default()
    };

    if let Some(hosts_path) = config.crawler.allowed_hosts_file.clone() {
        let content =
            std::fs::read_to_string(&hosts_path).map_err(|source| ConfigError::AllowedHosts {
                path: hosts_path.display().to_string(),
                source,
            })?;
        config.allowed_hosts = parse_allowed_hosts(&content);
        tracing::info!(
            "Loaded {} allowed hosts from {}",
            config.allowed_hosts.len(),
            hosts_path.display()
        );
    }

    validate(&config)?;

    Ok(config)
}

/// Parses a newline-delimited host list
///
/// Blank lines and lines starting with `#` are ignored; entries are trimmed
/// and lower-cased.
pub fn parse_allowed_hosts(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is logged at startup so separate runs can be told apart.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// The hash is `None` when the defaults were used because no file exists.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_config(path)?;
    let hash = if path.exists() {
        Some(compute_config_hash(path)?)
    } else {
        None
    };
    Ok((config, hash))
}
