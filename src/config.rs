//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.esgscore.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::models::{Category, DocumentType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".esgscore.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scoring API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry settings for category requests.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Identity provider settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Document history settings.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "esg_report.md".to_string()
}

/// ESG scoring API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout in seconds. 0 disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    300 // scoring one category of a long report can take minutes
}

/// Backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on any single delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Categories scored by every analysis, in display order.
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,

    /// Document type used when none is given on the command line.
    #[serde(default)]
    pub document_type: DocumentType,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            document_type: DocumentType::default(),
        }
    }
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Management API base URL.
    #[serde(default = "default_identity_url")]
    pub base_url: String,

    /// Secret key; prefer the CLERK_SECRET_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// ID of the signed-in account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_url(),
            secret_key: None,
            user_id: None,
        }
    }
}

fn default_identity_url() -> String {
    "https://api.clerk.com/v1".to_string()
}

/// Document history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.esgscore.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.categories.is_empty() {
            anyhow::bail!("[analysis] categories cannot be empty");
        }
        if self.history.page_size == 0 {
            anyhow::bail!("[history] page_size must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(max_retries) = args.max_retries {
            self.retry.max_retries = max_retries;
        }
        if let Some(base_delay_ms) = args.base_delay_ms {
            self.retry.base_delay_ms = base_delay_ms;
        }

        if let Some(ref user) = args.user {
            self.identity.user_id = Some(user.clone());
        }
        if let Some(ref key) = args.secret_key {
            self.identity.secret_key = Some(key.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level once CLI flags are merged: `--quiet` wins, otherwise
    /// `verbose` from the file or `--verbose` enables debug output.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.analysis.categories, Category::ALL.to_vec());
        assert_eq!(config.history.page_size, 10);
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.json"
format = "json"
verbose = true

[api]
base_url = "https://esg.example.com/api"
timeout_seconds = 0

[retry]
max_retries = 5

[analysis]
categories = ["environmental", "social"]
document_type = "annual_report"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.json");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);
        assert_eq!(config.api.base_url, "https://esg.example.com/api");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(
            config.analysis.categories,
            vec![Category::Environmental, Category::Social]
        );
        assert_eq!(config.analysis.document_type, DocumentType::AnnualReport);
        assert_eq!(config.identity.base_url, "https://api.clerk.com/v1");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[history]\npage_size = 25\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.history.page_size, 25);
    }

    #[test]
    fn test_load_rejects_empty_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[analysis]\ncategories = []\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config = Config::default();
        config.retry.max_retries = 7;

        let args = Args::try_parse_from([
            "esgscore",
            "pdf",
            "1",
            "--api-url",
            "https://esg.example.com",
            "--base-delay-ms",
            "50",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.api.base_url, "https://esg.example.com");
        assert_eq!(config.retry.base_delay_ms, 50);
        assert_eq!(config.retry.max_retries, 7);
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = Args::try_parse_from(["esgscore", "pdf", "1"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);

        let quiet = Args::try_parse_from(["esgscore", "--quiet", "pdf", "1"]).unwrap();
        config.merge_with_args(&quiet);
        assert_eq!(config.log_level(quiet.quiet), tracing::Level::ERROR);

        let mut defaults = Config::default();
        defaults.merge_with_args(&args);
        assert_eq!(defaults.log_level(args.quiet), tracing::Level::INFO);

        let verbose = Args::try_parse_from(["esgscore", "--verbose", "pdf", "1"]).unwrap();
        defaults.merge_with_args(&verbose);
        assert_eq!(defaults.log_level(verbose.quiet), tracing::Level::DEBUG);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[retry]"));
        assert!(toml_str.contains("[analysis]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.analysis.categories.len(), 4);
    }
}
