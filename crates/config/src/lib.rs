//! Configuration loading, validation, and management for ZooGent.
//!
//! Loads configuration from `~/.zoogent/config.toml` with environment
//! variable overrides. Validates all settings at startup. The loaded
//! [`AppConfig`] is immutable afterwards and shared by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use zoogent_core::UserType;

/// The root configuration structure.
///
/// Maps directly to `~/.zoogent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Web search backend
    #[serde(default)]
    pub search: SearchConfig,

    /// Allowed domains per search purpose
    #[serde(default)]
    pub domains: DomainConfig,

    /// Per-stage pipeline policy
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Agent instruction overrides, keyed by role name (e.g. "query_rewrite")
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub prompts: HashMap<String, String>,
}

fn default_provider() -> String {
    "bedrock".into()
}
fn default_model() -> String {
    "apac.amazon.nova-micro-v1:0".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("search", &self.search)
            .field("domains", &self.domains)
            .field("pipeline", &self.pipeline)
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// AWS region (Bedrock only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Google Custom Search API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Google Programmable Search Engine ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Hits requested per domain
    #[serde(default = "default_results_per_domain")]
    pub results_per_domain: u32,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_results_per_domain() -> u32 {
    1
}
fn default_search_timeout() -> u64 {
    15
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cx: None,
            endpoint: default_search_endpoint(),
            results_per_domain: default_results_per_domain(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("cx", &self.cx)
            .field("endpoint", &self.endpoint)
            .field("results_per_domain", &self.results_per_domain)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Domain allowlists. Iteration order matters: earlier domains win title
/// collisions during dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default = "default_forum_domains")]
    pub forum: Vec<String>,

    #[serde(default = "default_marketplace_b2c")]
    pub marketplace_b2c: Vec<String>,

    #[serde(default = "default_marketplace_b2b")]
    pub marketplace_b2b: Vec<String>,
}

fn default_forum_domains() -> Vec<String> {
    vec![
        "reddit.com/r/malaysia".into(),
        "facebook.com".into(),
        "quora.com".into(),
        "forum.lowyat.net".into(),
    ]
}
fn default_marketplace_b2c() -> Vec<String> {
    vec![
        "amazon.com".into(),
        "shopee.com.my".into(),
        "lazada.com.my".into(),
    ]
}
fn default_marketplace_b2b() -> Vec<String> {
    vec![
        "alibaba.com".into(),
        "made-in-china.com".into(),
        "globalsources.com".into(),
    ]
}

impl DomainConfig {
    /// The marketplace list for a buyer type.
    pub fn marketplace_for(&self, user_type: UserType) -> &[String] {
        match user_type {
            UserType::B2C => &self.marketplace_b2c,
            UserType::B2B => &self.marketplace_b2b,
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            forum: default_forum_domains(),
            marketplace_b2c: default_marketplace_b2c(),
            marketplace_b2b: default_marketplace_b2b(),
        }
    }
}

/// Which Recommend/Rank strategy the orchestrator runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Search marketplaces first, then filter and rank the full candidate set.
    #[default]
    DirectRank,
    /// Recommend product names from forum context, rank the names, then
    /// search each name on the marketplaces.
    RecommendThenRank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub variant: PipelineVariant,

    /// Per-call timeout for every agent invocation
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,

    /// Attempts for the recommendation agent before the request-only fallback
    #[serde(default = "default_recommend_attempts")]
    pub recommend_max_attempts: u32,

    /// Products kept after ranking and passed to the conclusion
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Expand the rewritten query into strategic sub-queries
    #[serde(default = "default_true")]
    pub expand_queries: bool,

    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    /// Run the relevance filter before ranking
    #[serde(default = "default_true")]
    pub relevance_filter: bool,

    /// Generate advertising introductions for this many top products (0 = off)
    #[serde(default = "default_advertise_top_k")]
    pub advertise_top_k: usize,

    /// Keep going when a single domain search fails
    #[serde(default = "default_true")]
    pub skip_failed_domains: bool,
}

fn default_llm_timeout() -> u64 {
    20
}
fn default_recommend_attempts() -> u32 {
    3
}
fn default_top_n() -> usize {
    20
}
fn default_max_sub_queries() -> usize {
    5
}
fn default_advertise_top_k() -> usize {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: PipelineVariant::default(),
            llm_timeout_secs: default_llm_timeout(),
            recommend_max_attempts: default_recommend_attempts(),
            top_n: default_top_n(),
            expand_queries: true,
            max_sub_queries: default_max_sub_queries(),
            relevance_filter: true,
            advertise_top_k: default_advertise_top_k(),
            skip_failed_domains: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.zoogent/config.toml).
    ///
    /// Also checks environment variables:
    /// - `ZOOGENT_API_KEY` (highest priority), `AWS_BEARER_TOKEN_BEDROCK`,
    ///   `OPENAI_API_KEY`
    /// - `ZOOGENT_PROVIDER`, `ZOOGENT_MODEL`
    /// - `GOOGLE_API_KEY`, `GOOGLE_CX`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`; values already present in
    /// the file win for secrets, env wins for provider and model selection.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("ZOOGENT_API_KEY")
                .or_else(|| lookup("AWS_BEARER_TOKEN_BEDROCK"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("ZOOGENT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("ZOOGENT_MODEL") {
            self.default_model = model;
        }

        if self.search.api_key.is_none() {
            self.search.api_key = lookup("GOOGLE_API_KEY");
        }
        if self.search.cx.is_none() {
            self.search.cx = lookup("GOOGLE_CX");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".zoogent")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.domains.marketplace_b2c.is_empty() || self.domains.marketplace_b2b.is_empty() {
            return Err(ConfigError::ValidationError(
                "marketplace domain lists must not be empty".into(),
            ));
        }

        if self.pipeline.recommend_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.recommend_max_attempts must be at least 1".into(),
            ));
        }

        if self.pipeline.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.top_n must be at least 1".into(),
            ));
        }

        if self.pipeline.llm_timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Check if the search backend has credentials.
    pub fn has_search_credentials(&self) -> bool {
        self.search.api_key.is_some() && self.search.cx.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            search: SearchConfig::default(),
            domains: DomainConfig::default(),
            pipeline: PipelineConfig::default(),
            prompts: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "bedrock");
        assert_eq!(config.pipeline.recommend_max_attempts, 3);
        assert_eq!(config.pipeline.top_n, 20);
        assert_eq!(config.search.results_per_domain, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.domains.forum, config.domains.forum);
        assert_eq!(parsed.pipeline.variant, PipelineVariant::DirectRank);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.recommend_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_marketplace_rejected() {
        let mut config = AppConfig::default();
        config.domains.marketplace_b2b.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_model, "apac.amazon.nova-micro-v1:0");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_provider = "openai"

[pipeline]
variant = "recommend_then_rank"
top_n = 5

[domains]
marketplace_b2c = ["amazon.com"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.pipeline.variant, PipelineVariant::RecommendThenRank);
        assert_eq!(config.pipeline.top_n, 5);
        assert_eq!(config.pipeline.recommend_max_attempts, 3);
        assert_eq!(config.domains.marketplace_b2c, vec!["amazon.com".to_string()]);
        assert_eq!(config.domains.forum.len(), 4);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "default_provider = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("AWS_BEARER_TOKEN_BEDROCK", "bedrock-token"),
            ("ZOOGENT_MODEL", "apac.amazon.nova-lite-v1:0"),
            ("GOOGLE_API_KEY", "g-key"),
            ("GOOGLE_CX", "g-cx"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("bedrock-token"));
        assert_eq!(config.default_model, "apac.amazon.nova-lite-v1:0");
        assert_eq!(config.default_provider, "bedrock");
        assert!(config.has_search_credentials());
    }

    #[test]
    fn file_secret_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|k| (k == "ZOOGENT_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn marketplace_selected_by_user_type() {
        let domains = DomainConfig::default();
        assert!(domains.marketplace_for(UserType::B2C).contains(&"shopee.com.my".to_string()));
        assert!(domains.marketplace_for(UserType::B2B).contains(&"alibaba.com".to_string()));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        config.search.api_key = Some("search-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("search-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("bedrock"));
        assert!(toml_str.contains("lazada.com.my"));
    }
}
